//! Room actor: an isolated Tokio task that owns one game.
//!
//! Every player event and every turn timer tick arrives through the same
//! unbounded channel and is applied by one sequential loop, so the
//! [`GameState`] never has more than one mutator. Outbound messages go to
//! per-player bounded channels. The room never waits on them: a player whose
//! queue is full is removed like a closed connection.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use doodle_game::settings::time_limit;
use doodle_game::{Dispatch, Drawing, GameError, GameState, Snapshot};
use doodle_protocol::{
    Inbound, JoinNotice, Outbound, Phase, Player, PlayerId, ProtocolError, Recipient,
    RoomCode, RoomSettings, TextMsg,
};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::{Handler, RoomError};

/// Channel sender for delivering outbound messages to a player.
pub type PlayerSender = mpsc::Sender<Outbound>;

/// Messages a player's connection may fall behind by before it is dropped.
pub const PLAYER_QUEUE_LEN: usize = 256;

/// A player's outbound channel, sized [`PLAYER_QUEUE_LEN`].
pub fn player_channel() -> (PlayerSender, mpsc::Receiver<Outbound>) {
    mpsc::channel(PLAYER_QUEUE_LEN)
}

/// Distinguishes two rooms that happened to reuse the same code.
static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Events delivered to a room actor through its channel.
///
/// Variants with a `oneshot::Sender` are requests: the caller waits for the
/// reply. Everything else is fire-and-forget.
pub(crate) enum RoomEvent {
    Join {
        player: Player,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Leave {
        player_id: PlayerId,
    },
    Message {
        sender: PlayerId,
        msg: Inbound,
    },
    /// Injected by the room's own timer task.
    TurnTimeout {
        turn: u64,
    },
    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },
    Capture {
        reply: oneshot::Sender<Result<Drawing, GameError>>,
    },
    Shutdown,
}

/// Room metadata (not the game itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub phase: Phase,
    pub player_count: usize,
    pub capacity: usize,
}

/// Handle to a running room. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    code: RoomCode,
    instance: u64,
    sender: mpsc::UnboundedSender<RoomEvent>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Unique per spawned room, even across reused codes.
    pub fn instance(&self) -> u64 {
        self.instance
    }

    /// Adds `player` to the room and registers `sender` as their outbound
    /// channel.
    ///
    /// On success the room has already queued a join notice to everyone and
    /// a state snapshot to the new player on `sender`.
    ///
    /// # Errors
    /// [`RoomError::Game`] with a capacity error if the room is full or
    /// playing, [`RoomError::Unavailable`] if the room is gone.
    pub async fn join(&self, player: Player, sender: PlayerSender) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomEvent::Join {
            player,
            sender,
            reply: reply_tx,
        })?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Removes a player. Non-blocking.
    pub fn leave(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.send(RoomEvent::Leave { player_id })
    }

    /// Queues one inbound message from `sender`. Never waits on the room.
    pub fn enqueue(&self, sender: PlayerId, msg: Inbound) -> Result<(), RoomError> {
        self.send(RoomEvent::Message { sender, msg })
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomEvent::GetInfo { reply: reply_tx })?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Encodes the current canvas.
    ///
    /// # Errors
    /// [`RoomError::Game`] wrapping a serialization error if encoding
    /// fails; the room itself carries on.
    pub async fn capture(&self) -> Result<Drawing, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomEvent::Capture { reply: reply_tx })?;
        Ok(reply_rx.await.map_err(|_| self.unavailable())??)
    }

    /// Asks the room to drain its queue and stop.
    pub fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomEvent::Shutdown)
    }

    /// `true` once the room has stopped accepting events.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn send(&self, event: RoomEvent) -> Result<(), RoomError> {
        self.sender.send(event).map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.code.clone())
    }
}

/// The room actor. Runs inside its own Tokio task.
pub(crate) struct Room<H: Handler> {
    game: GameState,
    /// Per-player outbound channels. Keys always match the game's players.
    connections: HashMap<PlayerId, PlayerSender>,
    handler: Arc<H>,
    receiver: mpsc::UnboundedReceiver<RoomEvent>,
    /// Timers hold a weak sender so they never keep the room alive.
    timer_tx: mpsc::WeakUnboundedSender<RoomEvent>,
    timer: Option<JoinHandle<()>>,
    armed_turn: u64,
    /// Players whose channel turned out to be closed.
    dead: Vec<PlayerId>,
    had_players: bool,
    closing: bool,
}

impl<H: Handler> Room<H> {
    /// Processes events until the last player leaves or shutdown is
    /// requested, then drains the queue and calls the handler.
    pub async fn run(mut self) {
        let code = self.game.code().clone();
        tracing::info!(room = %code, "room started");

        while let Some(event) = self.receiver.recv().await {
            let shutdown = matches!(event, RoomEvent::Shutdown);
            self.handle(event);
            if shutdown {
                tracing::info!(room = %code, "room shutting down");
                break;
            }
            if self.had_players && self.connections.is_empty() {
                tracing::info!(room = %code, "last player left");
                break;
            }
        }

        self.terminate().await;
        tracing::info!(room = %code, "room stopped");
    }

    async fn terminate(&mut self) {
        self.closing = true;
        self.disarm_timer();
        self.receiver.close();
        while let Some(event) = self.receiver.recv().await {
            self.handle(event);
        }

        let code = self.game.code().clone();
        self.handler.on_termination(&code);
        self.handler.do_shutdown(&code, self.game.results());
        self.forward_captures();
        if !self.game.turn().canvas().is_empty() {
            match self.game.capture() {
                Ok(drawing) => self.handler.do_capture(Snapshot {
                    room: code.clone(),
                    word: self.game.turn().curr_word().to_string(),
                    drawer: self.game.drawer_id(),
                    drawing,
                }),
                Err(e) => tracing::warn!(room = %code, error = %e, "final capture failed"),
            }
        }
        self.connections.clear();
    }

    /// Applies one event, then settles everything it caused.
    fn handle(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::Join {
                player,
                sender,
                reply,
            } => {
                let result = self.handle_join(player, sender);
                let _ = reply.send(result);
            }
            RoomEvent::Leave { player_id } => self.handle_leave(player_id),
            RoomEvent::Message { sender, msg } => self.handle_message(sender, msg),
            RoomEvent::TurnTimeout { turn } => {
                let out = self.game.expire_turn(turn, now());
                self.dispatch(out);
            }
            RoomEvent::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomEvent::Capture { reply } => {
                let _ = reply.send(self.game.capture());
            }
            RoomEvent::Shutdown => {}
        }

        self.reap_dead();
        self.forward_captures();
        self.sync_timer();
    }

    fn handle_join(&mut self, player: Player, sender: PlayerSender) -> Result<(), RoomError> {
        if self.closing {
            return Err(RoomError::Unavailable(self.game.code().clone()));
        }
        let player_id = player.id;
        self.game.add_player(player.clone())?;
        self.connections.insert(player_id, sender);
        self.had_players = true;
        tracing::info!(
            room = %self.game.code(),
            %player_id,
            players = self.connections.len(),
            "player joined"
        );

        self.dispatch(vec![(Recipient::All, Outbound::Join(JoinNotice { player }))]);
        let snapshot = self.game.snapshot(player_id, now());
        self.send_to(player_id, Outbound::State(snapshot));
        Ok(())
    }

    fn handle_leave(&mut self, player_id: PlayerId) {
        if self.connections.remove(&player_id).is_none() {
            tracing::debug!(room = %self.game.code(), %player_id, "leave from non-member");
            return;
        }
        match self.game.remove_player(player_id, now()) {
            Ok(out) => self.dispatch(out),
            Err(e) => tracing::warn!(room = %self.game.code(), %player_id, error = %e, "leave rejected"),
        }
        tracing::info!(
            room = %self.game.code(),
            %player_id,
            players = self.connections.len(),
            "player left"
        );
    }

    fn handle_message(&mut self, sender: PlayerId, msg: Inbound) {
        if !self.connections.contains_key(&sender) {
            tracing::warn!(room = %self.game.code(), %sender, "message from non-member, ignoring");
            return;
        }
        let code = msg.code().to_string();
        if let Err(e) = self.apply(sender, msg) {
            tracing::debug!(
                room = %self.game.code(),
                %sender,
                code = %code,
                error = %e,
                "message rejected"
            );
            self.send_to(sender, Outbound::error(e.status(), e.to_string()));
        }
    }

    fn apply(&mut self, sender: PlayerId, msg: Inbound) -> Result<(), RoomError> {
        let out = match msg {
            Inbound::Start => self.game.start_game(sender, now())?,
            Inbound::Text(TextMsg { text }) => self.game.chat(sender, text, now())?,
            Inbound::Draw(stroke) => self.game.draw(sender, stroke)?,
            Inbound::Leave => {
                self.handle_leave(sender);
                return Ok(());
            }
            other @ (Inbound::Join(_) | Inbound::Create(_) | Inbound::List(_)) => {
                return Err(ProtocolError::InvalidMessage(format!(
                    "`{}` is not accepted inside a room",
                    other.code()
                ))
                .into());
            }
            Inbound::Unknown { code, .. } => return Err(ProtocolError::UnknownCode(code).into()),
        };
        self.dispatch(out);
        Ok(())
    }

    /// Fans messages out in order. Closed or full channels are noted for
    /// reaping.
    fn dispatch(&mut self, out: Dispatch) {
        for (recipient, msg) in out {
            let targets: Vec<PlayerId> = self
                .connections
                .keys()
                .copied()
                .filter(|id| recipient.includes(*id))
                .collect();
            for player_id in targets {
                self.send_to(player_id, msg.clone());
            }
        }
    }

    fn send_to(&mut self, player_id: PlayerId, msg: Outbound) {
        let Some(sender) = self.connections.get(&player_id) else {
            return;
        };
        match sender.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(room = %self.game.code(), %player_id, "outbound queue full");
                self.dead.push(player_id);
            }
            Err(TrySendError::Closed(_)) => self.dead.push(player_id),
        }
    }

    /// Removes players whose connection went away, through the normal
    /// leave path. Leaving can broadcast, which can find more dead players.
    fn reap_dead(&mut self) {
        while let Some(player_id) = self.dead.pop() {
            if self.connections.contains_key(&player_id) {
                tracing::warn!(room = %self.game.code(), %player_id, "connection lost, removing player");
                self.handle_leave(player_id);
            }
        }
    }

    fn forward_captures(&mut self) {
        for snapshot in self.game.take_captures() {
            self.handler.do_capture(snapshot);
        }
    }

    /// Arms a timer for the current turn if it doesn't have one yet.
    fn sync_timer(&mut self) {
        if self.closing || self.game.phase() != Phase::Playing {
            self.disarm_timer();
            return;
        }
        let turn = self.game.turn_number();
        if turn == self.armed_turn {
            return;
        }
        self.disarm_timer();
        self.armed_turn = turn;

        let limit = time_limit(self.game.settings());
        if limit.is_zero() {
            return;
        }
        let tx = self.timer_tx.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(RoomEvent::TurnTimeout { turn });
            }
        }));
    }

    fn disarm_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.game.code().clone(),
            phase: self.game.phase(),
            player_count: self.connections.len(),
            capacity: self.game.settings().capacity,
        }
    }
}

/// Spawns a room task and returns a handle to it plus the task itself.
///
/// `settings` must already be defaulted.
pub fn spawn_room<H: Handler>(
    code: RoomCode,
    settings: RoomSettings,
    handler: Arc<H>,
) -> (RoomHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();

    let room = Room {
        game: GameState::new(code.clone(), settings),
        connections: HashMap::new(),
        handler,
        receiver: rx,
        timer_tx: tx.downgrade(),
        timer: None,
        armed_turn: 0,
        dead: Vec::new(),
        had_players: false,
        closing: false,
    };
    let task = tokio::spawn(room.run());

    let handle = RoomHandle {
        code,
        instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
        sender: tx,
    };
    (handle, task)
}

/// Tokio's clock, so paused-time tests drive turn timers too.
fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}
