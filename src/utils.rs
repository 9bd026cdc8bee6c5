use std::path::Path;

use tokio::io::AsyncBufReadExt;
use zeroize::Zeroizing;

use crate::account::AccountRecord;

const ACCOUNT_COLUMNS: [&str; 5] = [
    "private_key",
    "http_rpc",
    "referrer_address",
    "max_gas_price",
    "min_gas_limit",
];

pub async fn read_file_lines(path: impl AsRef<Path>) -> eyre::Result<Vec<String>> {
    let file = tokio::fs::read(path).await?;
    let mut lines = file.lines();

    let mut contents = vec![];
    while let Some(line) = lines.next_line().await? {
        contents.push(line);
    }

    Ok(contents)
}

pub async fn read_account_records(path: impl AsRef<Path>) -> eyre::Result<Vec<AccountRecord>> {
    let lines = read_file_lines(path).await?;
    parse_account_records(&lines)
}

/// Parses comma-delimited rows under a header naming the account columns.
///
/// Fields are split on every comma; quoting is not supported, so no field may
/// itself contain a comma or quotes. Rows are not validated here: a short row
/// simply leaves fields empty so the account fails on its own later without
/// taking the batch down.
pub fn parse_account_records(lines: &[String]) -> eyre::Result<Vec<AccountRecord>> {
    let mut rows = lines.iter().filter(|line| !line.trim().is_empty());

    let header: Vec<&str> = rows
        .next()
        .ok_or_else(|| eyre::eyre!("accounts file is empty"))?
        .split(',')
        .map(|column| column.trim().trim_start_matches('\u{feff}'))
        .collect();

    let mut positions = [0usize; 5];
    for (position, column) in positions.iter_mut().zip(ACCOUNT_COLUMNS) {
        *position = header
            .iter()
            .position(|name| *name == column)
            .ok_or_else(|| eyre::eyre!("accounts file header is missing '{column}'"))?;
    }

    let records = rows
        .map(|row| {
            let fields: Vec<&str> = row.split(',').map(str::trim).collect();
            let field = |idx: usize| fields.get(positions[idx]).unwrap_or(&"").to_string();

            AccountRecord {
                private_key: Zeroizing::new(field(0)),
                http_rpc: field(1),
                referrer_address: field(2),
                max_gas_price: field(3),
                min_gas_limit: field(4),
            }
        })
        .collect();

    Ok(records)
}
