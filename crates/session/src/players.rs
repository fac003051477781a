//! Remote-player plumbing: synchronous proxies backed by channels, with an
//! async agent trait for frontends and AIs.
//!
//! The engine calls [`frontline_core::bridge::RemotePlayer`] synchronously
//! and may block on a human. [`ChannelPlayer`] bridges that call onto a
//! query channel; whoever holds the receiving end answers at leisure. If
//! the session is torn down mid-wait, the channel closes and the pending
//! call resolves to a disconnect, which the engine treats as fatal.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use frontline_core::bridge::RemotePlayer;
use frontline_core::error::Disconnected;
use frontline_core::ids::{PlayerId, TerritoryId, UnitId};

/// One pending question for a player.
#[derive(Debug)]
pub enum PlayerQuery {
    BombardmentTarget {
        candidates: Vec<TerritoryId>,
        from: Option<TerritoryId>,
        reply: oneshot::Sender<Option<TerritoryId>>,
    },
    UnitTarget {
        territory: TerritoryId,
        candidates: Vec<UnitId>,
        reply: oneshot::Sender<Option<UnitId>>,
    },
    AcceptAction {
        proposer: PlayerId,
        question: String,
        reply: oneshot::Sender<bool>,
    },
    Report {
        message: String,
    },
}

/// Synchronous [`RemotePlayer`] that forwards every call over a channel.
///
/// Must be called from outside the async runtime (the session runs
/// delegates on a blocking thread). A dropped receiver or reply sender
/// reads as [`Disconnected`].
pub struct ChannelPlayer {
    queries: mpsc::Sender<PlayerQuery>,
}

impl ChannelPlayer {
    /// Creates the proxy and the receiving end a frontend drains.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<PlayerQuery>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { queries: tx }, rx)
    }

    /// Creates a proxy serviced by an async agent task.
    pub fn with_agent(agent: impl PlayerAgent) -> Self {
        let (player, rx) = Self::new(8);
        serve_agent(rx, agent);
        player
    }

    fn ask<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> PlayerQuery,
    ) -> Result<T, Disconnected> {
        let (tx, rx) = oneshot::channel();
        self.queries
            .blocking_send(build(tx))
            .map_err(|_| Disconnected)?;
        rx.blocking_recv().map_err(|_| Disconnected)
    }
}

impl RemotePlayer for ChannelPlayer {
    fn choose_bombardment_target(
        &self,
        candidates: &[TerritoryId],
        from: Option<TerritoryId>,
    ) -> Result<Option<TerritoryId>, Disconnected> {
        self.ask(|reply| PlayerQuery::BombardmentTarget {
            candidates: candidates.to_vec(),
            from,
            reply,
        })
    }

    fn choose_unit_target(
        &self,
        territory: TerritoryId,
        candidates: &[UnitId],
    ) -> Result<Option<UnitId>, Disconnected> {
        self.ask(|reply| PlayerQuery::UnitTarget {
            territory,
            candidates: candidates.to_vec(),
            reply,
        })
    }

    fn accept_action(&self, proposer: PlayerId, question: &str) -> Result<bool, Disconnected> {
        self.ask(|reply| PlayerQuery::AcceptAction {
            proposer,
            question: question.to_string(),
            reply,
        })
    }

    fn report(&self, message: &str) -> Result<(), Disconnected> {
        self.queries
            .blocking_send(PlayerQuery::Report {
                message: message.to_string(),
            })
            .map_err(|_| Disconnected)
    }
}

/// Async decision-making for one player: a human frontend or an AI policy.
#[async_trait]
pub trait PlayerAgent: Send + Sync + 'static {
    async fn choose_bombardment_target(
        &self,
        candidates: Vec<TerritoryId>,
        from: Option<TerritoryId>,
    ) -> Option<TerritoryId>;

    async fn choose_unit_target(
        &self,
        territory: TerritoryId,
        candidates: Vec<UnitId>,
    ) -> Option<UnitId>;

    async fn accept_action(&self, proposer: PlayerId, question: String) -> bool;

    async fn report(&self, message: String);
}

/// Services a query stream with an agent until the sending side closes.
pub fn serve_agent(
    mut queries: mpsc::Receiver<PlayerQuery>,
    agent: impl PlayerAgent,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(query) = queries.recv().await {
            match query {
                PlayerQuery::BombardmentTarget {
                    candidates,
                    from,
                    reply,
                } => {
                    let _ = reply.send(agent.choose_bombardment_target(candidates, from).await);
                }
                PlayerQuery::UnitTarget {
                    territory,
                    candidates,
                    reply,
                } => {
                    let _ = reply.send(agent.choose_unit_target(territory, candidates).await);
                }
                PlayerQuery::AcceptAction {
                    proposer,
                    question,
                    reply,
                } => {
                    let _ = reply.send(agent.accept_action(proposer, question).await);
                }
                PlayerQuery::Report { message } => {
                    agent.report(message).await;
                }
            }
        }
        tracing::debug!("player query stream closed");
    })
}

/// Agent that declines every attack and accepts every proposal. The
/// fallback when a seat has no frontend attached.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassiveAgent;

#[async_trait]
impl PlayerAgent for PassiveAgent {
    async fn choose_bombardment_target(
        &self,
        _candidates: Vec<TerritoryId>,
        _from: Option<TerritoryId>,
    ) -> Option<TerritoryId> {
        None
    }

    async fn choose_unit_target(
        &self,
        _territory: TerritoryId,
        candidates: Vec<UnitId>,
    ) -> Option<UnitId> {
        candidates.first().copied()
    }

    async fn accept_action(&self, _proposer: PlayerId, _question: String) -> bool {
        true
    }

    async fn report(&self, _message: String) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn channel_player_round_trips_through_an_agent() {
        let player = ChannelPlayer::with_agent(PassiveAgent);
        let answer = tokio::task::spawn_blocking(move || player.accept_action(PlayerId(0), "ok?"))
            .await
            .unwrap();
        assert_eq!(answer, Ok(true));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dropping_the_receiver_reads_as_disconnect() {
        let (player, rx) = ChannelPlayer::new(4);
        drop(rx);
        let answer = tokio::task::spawn_blocking(move || player.report("hello"))
            .await
            .unwrap();
        assert_eq!(answer, Err(Disconnected));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tearing_down_mid_wait_cancels_the_pending_query() {
        let (player, mut rx) = ChannelPlayer::new(4);
        let ask = tokio::task::spawn_blocking(move || {
            let candidates = [TerritoryId(1)];
            player.choose_bombardment_target(&candidates, None)
        });
        match rx.recv().await.expect("query arrives") {
            PlayerQuery::BombardmentTarget { reply, .. } => drop(reply),
            other => panic!("unexpected query {other:?}"),
        }
        assert_eq!(ask.await.unwrap(), Err(Disconnected));
    }
}
