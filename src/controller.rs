use crate::{
    app::{AppState, Effect, Message, PendingAction},
    error::DappError,
    history::{self, HistoryLimits},
    wallet::Connector,
};
use log::{debug, error, warn};
use std::sync::Arc;
use tokio::{select, sync::mpsc};

/// Owns the application state and runs the effects `AppState::update`
/// asks for. Every effect runs as its own task and reports back through
/// the completion channel.
pub struct Controller {
    state: AppState,
    connector: Arc<dyn Connector>,
    limits: HistoryLimits,

    completion_sender: mpsc::UnboundedSender<Message>,
    completion_receiver: mpsc::UnboundedReceiver<Message>,
}

impl Controller {
    pub fn new(state: AppState, connector: Arc<dyn Connector>, limits: HistoryLimits) -> Self {
        let (completion_sender, completion_receiver) = mpsc::unbounded_channel();
        Self {
            state,
            connector,
            limits,
            completion_sender,
            completion_receiver,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Runs until `input` closes, calling `on_change` after every message
    pub async fn run<F>(mut self, mut input: mpsc::Receiver<Message>, mut on_change: F)
    where
        F: FnMut(&AppState),
    {
        on_change(&self.state);
        loop {
            select! {
                message = input.recv() => {
                    match message {
                        Some(message) => self.dispatch(message),
                        None => return,
                    }
                }
                Some(message) = self.completion_receiver.recv() => {
                    self.dispatch(message);
                }
            }
            on_change(&self.state);
        }
    }

    pub fn dispatch(&mut self, message: Message) {
        for effect in self.state.update(message) {
            self.spawn(effect);
        }
    }

    /// Waits for the next completion and applies it. Returns `false` if no
    /// completion can arrive anymore.
    pub async fn step(&mut self) -> bool {
        match self.completion_receiver.recv().await {
            Some(message) => {
                self.dispatch(message);
                true
            }
            None => false,
        }
    }

    fn spawn(&self, effect: Effect) {
        let sender = self.completion_sender.clone();
        debug!("(controller) running {:?}", effect);

        match effect {
            Effect::Connect => {
                let connector = self.connector.clone();
                tokio::spawn(async move {
                    let result = connector.connect().await;
                    emit(&sender, Message::Connected(result));
                });
            }
            Effect::FetchBalance { request, account } => {
                let Some(session) = self.state.session().cloned() else {
                    return;
                };
                tokio::spawn(async move {
                    let result = session.ledger.balance(account).await;
                    emit(&sender, Message::BalanceLoaded { request, result });
                });
            }
            Effect::FetchHistory { request, account } => {
                let Some(session) = self.state.session().cloned() else {
                    return;
                };
                let limits = self.limits;
                tokio::spawn(async move {
                    let result =
                        history::reconstruct(session.ledger.as_ref(), account, limits).await;
                    emit(&sender, Message::HistoryLoaded { request, result });
                });
            }
            Effect::Execute(action) => {
                let kind = action.kind();
                let Some(session) = self.state.session().cloned() else {
                    emit(
                        &sender,
                        Message::ActionFinished {
                            kind,
                            result: Err(DappError::InvalidInput("not connected".into())),
                        },
                    );
                    return;
                };
                tokio::spawn(async move {
                    let result = match action {
                        PendingAction::SubmitTransaction {
                            receiver, amount, ..
                        } => session.gateway.submit_transaction(receiver, amount).await,
                        PendingAction::MineBlock => session.gateway.mine_block().await,
                    };
                    if let Err(e) = &result {
                        warn!("(controller) {} failed: {}", kind.describe(), e);
                    }
                    emit(&sender, Message::ActionFinished { kind, result });
                });
            }
            Effect::DismissSplashAfter { id, delay } => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    emit(&sender, Message::SplashExpired { id });
                });
            }
        }
    }
}

fn emit(sender: &mpsc::UnboundedSender<Message>, message: Message) {
    if sender.send(message).is_err() {
        error!("Completion dropped: controller receiver closed");
    }
}
