//! Line commands accepted by the terminal front end.

use crate::app::Message;

pub const HELP: &str = "\
commands:
  connect              connect a wallet
  sender <address>     set the sender field
  receiver <address>   set the receiver field
  amount <eth>         set the amount field
  submit               submit the transaction form
  mine                 mine a new block
  confirm | cancel     answer a confirmation prompt
  balance              show or hide the balance
  history              show or hide the transaction history
  theme                switch between light and dark mode
  refresh              reload balance and history
  help                 show this text
  quit                 exit";

#[derive(Debug)]
pub enum Command {
    Message(Message),
    Help,
    Quit,
}

/// Parses one input line. Blank lines give `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let message = match word.to_ascii_lowercase().as_str() {
        "connect" => Message::Connect,
        "sender" => Message::EditSender(rest.to_string()),
        "receiver" => Message::EditReceiver(rest.to_string()),
        "amount" => Message::EditAmount(rest.to_string()),
        "submit" => Message::Submit,
        "mine" => Message::Mine,
        "confirm" | "y" | "yes" => Message::Confirm,
        "cancel" | "n" | "no" => Message::Cancel,
        "balance" => Message::ToggleBalance,
        "history" => Message::ToggleHistory,
        "theme" => Message::ToggleDarkMode,
        "refresh" => Message::Refresh,
        "help" | "?" => return Ok(Some(Command::Help)),
        "quit" | "exit" => return Ok(Some(Command::Quit)),
        other => return Err(format!("unknown command {:?}, type `help`", other)),
    };
    Ok(Some(Command::Message(message)))
}
