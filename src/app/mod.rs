//! Interaction state and the update function driving it.
//!
//! `AppState::update` is synchronous and never touches the network. Anything
//! that has to wait on the wallet or the ledger is returned as an [`Effect`];
//! the controller runs it and feeds the outcome back as a [`Message`].

pub mod view;

use crate::{
    config::UiConfig,
    error::DappError,
    history::TransactionRecord,
    units::parse_amount,
    wallet::Session,
};
use ethers::types::{Address, TxHash, U256};
use log::{debug, warn};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    SubmitTransaction,
    MineBlock,
}

impl ActionKind {
    pub fn describe(&self) -> &'static str {
        match self {
            ActionKind::SubmitTransaction => "transaction submission",
            ActionKind::MineBlock => "block mining",
        }
    }

    fn running_status(&self) -> &'static str {
        match self {
            ActionKind::SubmitTransaction => "Submitting transaction...",
            ActionKind::MineBlock => "Mining block...",
        }
    }

    fn done_status(&self) -> &'static str {
        match self {
            ActionKind::SubmitTransaction => "Transaction submitted!",
            ActionKind::MineBlock => "Block mined!",
        }
    }

    fn done_splash(&self) -> &'static str {
        match self {
            ActionKind::SubmitTransaction => "Transaction Successful!",
            ActionKind::MineBlock => "Block Mined Successfully!",
        }
    }
}

/// A contract call waiting to run. Captured when it is requested so that
/// editing the form while a confirmation is open does not change it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    SubmitTransaction {
        receiver: Address,
        /// wei
        amount: U256,
        /// amount as typed, for prompts
        amount_text: String,
    },
    MineBlock,
}

impl PendingAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            PendingAction::SubmitTransaction { .. } => ActionKind::SubmitTransaction,
            PendingAction::MineBlock => ActionKind::MineBlock,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingConfirmation,
    Executing,
    /// Last run failed; back to `Idle` once the error overlay expires
    Failed,
}

impl Phase {
    fn is_busy(&self) -> bool {
        matches!(self, Phase::AwaitingConfirmation | Phase::Executing)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSlot {
    pub phase: Phase,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub message: String,
    pub action: PendingAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splash {
    pub id: u64,
    pub message: String,
    pub is_error: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub sender: String,
    pub receiver: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    /// Transfers strictly above this (wei) need confirmation
    pub confirm_threshold: U256,
    pub splash_timeout: Duration,
    pub dark_mode: bool,
}

impl AppSettings {
    pub fn from_config(ui: &UiConfig) -> anyhow::Result<Self> {
        Ok(Self {
            confirm_threshold: ui.confirm_threshold()?,
            splash_timeout: ui.splash_timeout(),
            dark_mode: ui.dark_mode,
        })
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            confirm_threshold: U256::exp10(18) * 10,
            splash_timeout: Duration::from_secs(2),
            dark_mode: false,
        }
    }
}

#[derive(Debug)]
pub enum Message {
    Connect,
    EditSender(String),
    EditReceiver(String),
    EditAmount(String),
    Submit,
    Mine,
    Confirm,
    Cancel,
    ToggleBalance,
    ToggleHistory,
    ToggleDarkMode,
    Refresh,

    Connected(Result<Session, DappError>),
    BalanceLoaded {
        request: u64,
        result: Result<U256, DappError>,
    },
    HistoryLoaded {
        request: u64,
        result: Result<Vec<TransactionRecord>, DappError>,
    },
    ActionFinished {
        kind: ActionKind,
        result: Result<TxHash, DappError>,
    },
    SplashExpired {
        id: u64,
    },
}

/// Work the controller runs outside the update function. Each effect ends
/// with exactly one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Connect,
    FetchBalance { request: u64, account: Address },
    FetchHistory { request: u64, account: Address },
    Execute(PendingAction),
    DismissSplashAfter { id: u64, delay: Duration },
}

#[derive(Debug)]
pub struct AppState {
    settings: AppSettings,
    session: Option<Session>,
    /// Id of the newest balance/history fetch. Every refresh takes a new one
    last_request: u64,
    /// First request issued for the current session; anything older belongs
    /// to a replaced session
    session_request: u64,
    /// Newest request whose result has been applied, per kind. Results at or
    /// below it arrived late and are dropped
    balance_applied: u64,
    history_applied: u64,
    next_splash_id: u64,

    pub connecting: bool,
    pub error: Option<String>,
    pub form: FormState,
    pub balance: Option<U256>,
    pub history: Vec<TransactionRecord>,
    pub history_loading: bool,
    pub submit: ActionSlot,
    pub mine: ActionSlot,
    pub confirmation: Option<Confirmation>,
    pub splash: Option<Splash>,
    pub show_balance: bool,
    pub show_history: bool,
    pub dark_mode: bool,
}

impl AppState {
    pub fn new(settings: AppSettings) -> Self {
        let dark_mode = settings.dark_mode;
        Self {
            settings,
            session: None,
            last_request: 0,
            session_request: 0,
            balance_applied: 0,
            history_applied: 0,
            next_splash_id: 0,
            connecting: false,
            error: None,
            form: FormState::default(),
            balance: None,
            history: Vec::new(),
            history_loading: false,
            submit: ActionSlot::default(),
            mine: ActionSlot::default(),
            confirmation: None,
            splash: None,
            show_balance: true,
            show_history: true,
            dark_mode,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn account(&self) -> Option<Address> {
        self.session.as_ref().map(|s| s.account)
    }

    pub fn last_request(&self) -> u64 {
        self.last_request
    }

    pub fn slot(&self, kind: ActionKind) -> &ActionSlot {
        match kind {
            ActionKind::SubmitTransaction => &self.submit,
            ActionKind::MineBlock => &self.mine,
        }
    }

    fn slot_mut(&mut self, kind: ActionKind) -> &mut ActionSlot {
        match kind {
            ActionKind::SubmitTransaction => &mut self.submit,
            ActionKind::MineBlock => &mut self.mine,
        }
    }

    pub fn update(&mut self, message: Message) -> Vec<Effect> {
        match message {
            Message::Connect => {
                if self.connecting {
                    return vec![];
                }
                self.connecting = true;
                self.error = None;
                vec![Effect::Connect]
            }
            Message::Connected(Ok(session)) => {
                self.connecting = false;
                self.error = None;
                self.balance = None;
                self.history.clear();
                // a prompt raised for the previous account must not run
                // under the new one
                if let Some(confirmation) = self.confirmation.take() {
                    debug!(
                        "(app) dropping {} prompt on reconnect",
                        confirmation.action.kind().describe()
                    );
                    self.slot_mut(confirmation.action.kind()).phase = Phase::Idle;
                }
                self.session = Some(session);
                let effects = self.refresh();
                self.session_request = self.last_request;
                effects
            }
            Message::Connected(Err(e)) => {
                self.connecting = false;
                self.error = Some(e.to_string());
                vec![]
            }

            Message::EditSender(v) => {
                self.form.sender = v;
                vec![]
            }
            Message::EditReceiver(v) => {
                self.form.receiver = v;
                vec![]
            }
            Message::EditAmount(v) => {
                self.form.amount = v;
                vec![]
            }

            Message::Submit => self.request(ActionKind::SubmitTransaction),
            Message::Mine => self.request(ActionKind::MineBlock),
            Message::Confirm => match self.confirmation.take() {
                Some(confirmation) => self.execute(confirmation.action),
                None => vec![],
            },
            Message::Cancel => {
                if let Some(confirmation) = self.confirmation.take() {
                    debug!("(app) {} cancelled", confirmation.action.kind().describe());
                    self.slot_mut(confirmation.action.kind()).phase = Phase::Idle;
                }
                vec![]
            }

            Message::ToggleBalance => {
                self.show_balance = !self.show_balance;
                vec![]
            }
            Message::ToggleHistory => {
                self.show_history = !self.show_history;
                vec![]
            }
            Message::ToggleDarkMode => {
                self.dark_mode = !self.dark_mode;
                vec![]
            }
            Message::Refresh => self.refresh(),

            Message::BalanceLoaded { request, result } => {
                if request < self.session_request || request <= self.balance_applied {
                    debug!("(app) dropping balance from request {}", request);
                    return vec![];
                }
                self.balance_applied = request;
                match result {
                    Ok(balance) => {
                        self.balance = Some(balance);
                        vec![]
                    }
                    Err(e) => {
                        warn!("(app) balance fetch failed: {}", e);
                        vec![self.show_splash(e.display_message(), true)]
                    }
                }
            }
            Message::HistoryLoaded { request, result } => {
                if request < self.session_request || request <= self.history_applied {
                    debug!("(app) dropping history from request {}", request);
                    return vec![];
                }
                self.history_applied = request;
                self.history_loading = request < self.last_request;
                match result {
                    Ok(history) => {
                        self.history = history;
                        vec![]
                    }
                    Err(e) => {
                        warn!("(app) history scan failed: {}", e);
                        vec![self.show_splash(e.display_message(), true)]
                    }
                }
            }

            Message::ActionFinished { kind, result } => self.finish(kind, result),
            Message::SplashExpired { id } => {
                if self.splash.as_ref().map(|s| s.id) == Some(id) {
                    self.splash = None;
                    for slot in [&mut self.submit, &mut self.mine] {
                        if slot.phase == Phase::Failed {
                            slot.phase = Phase::Idle;
                        }
                    }
                }
                vec![]
            }
        }
    }

    /// Balance and history for the current session
    fn refresh(&mut self) -> Vec<Effect> {
        let Some(account) = self.account() else {
            return vec![];
        };
        self.last_request += 1;
        self.history_loading = true;
        vec![
            Effect::FetchBalance {
                request: self.last_request,
                account,
            },
            Effect::FetchHistory {
                request: self.last_request,
                account,
            },
        ]
    }

    fn request(&mut self, kind: ActionKind) -> Vec<Effect> {
        if let Err(e) = self.check_can_request(kind) {
            debug!("(app) {} rejected: {}", kind.describe(), e);
            return vec![self.show_splash(e.display_message(), true)];
        }

        let action = match kind {
            ActionKind::SubmitTransaction => match self.build_submission() {
                Ok(action) => action,
                Err(e) => {
                    self.submit.status = e.display_message();
                    return vec![];
                }
            },
            ActionKind::MineBlock => PendingAction::MineBlock,
        };

        match self.confirmation_message(&action) {
            Some(message) => {
                self.slot_mut(kind).phase = Phase::AwaitingConfirmation;
                self.confirmation = Some(Confirmation { message, action });
                vec![]
            }
            None => self.execute(action),
        }
    }

    fn check_can_request(&self, kind: ActionKind) -> Result<(), DappError> {
        if self.session.is_none() {
            return Err(DappError::InvalidInput("connect a wallet first".into()));
        }
        if self.slot(kind).phase.is_busy() {
            return Err(DappError::Busy(kind));
        }
        if self.confirmation.is_some() {
            return Err(DappError::InvalidInput(
                "confirm or cancel the pending action first".into(),
            ));
        }
        Ok(())
    }

    fn build_submission(&self) -> Result<PendingAction, DappError> {
        let receiver_text = self.form.receiver.trim();
        let receiver: Address = receiver_text.parse().map_err(|_| {
            DappError::InvalidInput(format!("invalid receiver address: {:?}", receiver_text))
        })?;
        let amount = parse_amount(&self.form.amount)?;

        let sender = self.form.sender.trim();
        if !sender.is_empty() && sender.parse::<Address>().ok() != self.account() {
            // the call is always signed by the connected account
            warn!(
                "(app) sender field {:?} differs from connected account",
                sender
            );
        }

        Ok(PendingAction::SubmitTransaction {
            receiver,
            amount,
            amount_text: self.form.amount.trim().to_string(),
        })
    }

    fn confirmation_message(&self, action: &PendingAction) -> Option<String> {
        match action {
            PendingAction::SubmitTransaction { amount, .. }
                if *amount > self.settings.confirm_threshold =>
            {
                Some(format!(
                    "You are about to send more than {} ETH. Are you sure you want to proceed?",
                    crate::units::format_ether(self.settings.confirm_threshold)
                        .trim_end_matches(".0")
                ))
            }
            PendingAction::SubmitTransaction { .. } => None,
            PendingAction::MineBlock => {
                Some("Are you sure you want to mine a new block?".to_string())
            }
        }
    }

    fn execute(&mut self, action: PendingAction) -> Vec<Effect> {
        let kind = action.kind();
        let slot = self.slot_mut(kind);
        slot.phase = Phase::Executing;
        slot.status = kind.running_status().to_string();
        vec![Effect::Execute(action)]
    }

    fn finish(&mut self, kind: ActionKind, result: Result<TxHash, DappError>) -> Vec<Effect> {
        let (message, is_error) = match result {
            Ok(hash) => {
                debug!("(app) {} done: {:?}", kind.describe(), hash);
                let slot = self.slot_mut(kind);
                slot.phase = Phase::Idle;
                slot.status = kind.done_status().to_string();
                (kind.done_splash().to_string(), false)
            }
            Err(e) => {
                let message = e.display_message();
                let slot = self.slot_mut(kind);
                slot.phase = Phase::Failed;
                slot.status = message.clone();
                (message, true)
            }
        };

        let mut effects = vec![self.show_splash(message, is_error)];
        if !is_error {
            effects.extend(self.refresh());
        }
        effects
    }

    fn show_splash(&mut self, message: String, is_error: bool) -> Effect {
        self.next_splash_id += 1;
        let id = self.next_splash_id;
        self.splash = Some(Splash {
            id,
            message,
            is_error,
        });
        Effect::DismissSplashAfter {
            id,
            delay: self.settings.splash_timeout,
        }
    }
}
