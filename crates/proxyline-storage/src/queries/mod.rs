// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.

pub mod conversations;
pub mod messages;
pub mod notifications;
pub mod pool;
pub mod presence;

/// Build a `?1, ?2, ...` placeholder list for a dynamic `IN (...)` clause.
pub(crate) fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error for TEXT columns that fail to parse into a domain enum.
pub(crate) fn invalid_text(value: &str, what: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        format!("invalid {what}: `{value}`").into(),
    )
}
