//! Plain text rendering of [`AppState`] for the terminal front end.

use super::{AppState, Phase};
use crate::units::format_ether;
use ethers::{types::Address, utils::to_checksum};
use std::fmt::Write;

const TITLE: &str = "Blockchain DApp";
const SUBTITLE: &str = "Wallet Connection & Transactions";

/// `0x1234...abcd`
pub fn short_address(address: &Address) -> String {
    shorten(&format!("{:?}", address), 6, 4)
}

/// `0x123456...abcdef`
pub fn short_hash(hash: &impl std::fmt::Debug) -> String {
    shorten(&format!("{:?}", hash), 8, 6)
}

fn shorten(full: &str, head: usize, tail: usize) -> String {
    if full.len() <= head + tail {
        return full.to_string();
    }
    format!("{}...{}", &full[..head], &full[full.len() - tail..])
}

pub fn render(state: &AppState) -> String {
    let mut out = String::new();
    // writing to a String cannot fail
    let _ = write_view(state, &mut out);
    out
}

fn write_view(state: &AppState, out: &mut String) -> std::fmt::Result {
    let theme = if state.dark_mode { "dark" } else { "light" };
    writeln!(out, "== {} ==  [{} mode]", TITLE, theme)?;
    writeln!(out, "{}", SUBTITLE)?;

    if let Some(confirmation) = &state.confirmation {
        writeln!(out)?;
        writeln!(out, "!! {}", confirmation.message)?;
        writeln!(out, "!! type `confirm` or `cancel`")?;
    }
    if let Some(splash) = &state.splash {
        writeln!(out)?;
        let marker = if splash.is_error { "xx" } else { "**" };
        writeln!(out, "{} {} {}", marker, splash.message, marker)?;
    }
    writeln!(out)?;

    let Some(account) = state.account() else {
        if state.connecting {
            writeln!(out, "Connecting...")?;
        } else {
            writeln!(out, "Not connected. Type `connect` to connect a wallet.")?;
        }
        if let Some(error) = &state.error {
            writeln!(out, "{}", error)?;
        }
        return Ok(());
    };

    writeln!(out, "Connected: {}", to_checksum(&account, None))?;
    if let Some(error) = &state.error {
        writeln!(out, "{}", error)?;
    }
    if let Some(balance) = state.balance {
        if state.show_balance {
            writeln!(out, "Balance: {} ETH", format_ether(balance))?;
        } else {
            writeln!(out, "Balance: ****")?;
        }
    }

    writeln!(out)?;
    writeln!(out, "-- Submit Transaction --")?;
    writeln!(out, "Sender:   {}", state.form.sender)?;
    writeln!(out, "Receiver: {}", state.form.receiver)?;
    writeln!(out, "Amount:   {} ETH", state.form.amount)?;
    if !state.submit.status.is_empty() {
        writeln!(out, "{}", state.submit.status)?;
    }

    writeln!(out)?;
    writeln!(out, "-- Mine Block --")?;
    if !state.mine.status.is_empty() {
        writeln!(out, "{}", state.mine.status)?;
    } else if state.mine.phase == Phase::Idle {
        writeln!(out, "Type `mine` to mine a new block.")?;
    }

    if state.history_loading && state.history.is_empty() {
        writeln!(out)?;
        writeln!(out, "Loading transaction history...")?;
    } else if !state.history.is_empty() {
        writeln!(out)?;
        writeln!(out, "-- Transaction History ({}) --", state.history.len())?;
        if state.show_history {
            for tx in &state.history {
                writeln!(out, "Tx Hash: {}", short_hash(&tx.hash))?;
                writeln!(out, "  From:  {}", short_address(&tx.from))?;
                match &tx.to {
                    Some(to) => writeln!(out, "  To:    {}", short_address(to))?,
                    None => writeln!(out, "  To:    -")?,
                }
                writeln!(out, "  Value: {} ETH", tx.value)?;
                writeln!(out, "  Block: {}", tx.block_number)?;
            }
        } else {
            writeln!(out, "(hidden, type `history` to view)")?;
        }
    }
    Ok(())
}
