//! The game state machine: players, phase, rounds, and the active turn.
//!
//! `GameState` is plain data plus rules. It never touches a socket or a
//! clock; callers pass `now` in and get back the messages to deliver as
//! `(Recipient, Outbound)` pairs. The room actor owns exactly one of these
//! and is the only thing that mutates it.

use std::collections::HashSet;
use std::time::Instant;

use doodle_protocol::{
    BeginMsg, ChatMsg, Circle, EndMsg, FinishMsg, GameResult, LeaveNotice, Outbound, Phase,
    Player, PlayerId, Recipient, RoomCode, RoomSettings, RoomSnapshot, ScoreMsg,
};
use rand::seq::IndexedRandom;

use crate::settings::MIN_PLAYERS;
use crate::turn::{Drawing, GameTurn, GUESS_REWARD};
use crate::GameError;

/// Messages produced by one state change, in the order they must be sent.
pub type Dispatch = Vec<(Recipient, Outbound)>;

/// Longest chat line accepted, in characters.
pub const MAX_CHAT_LEN: usize = 256;

/// A finished turn's drawing, ready for the capture handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub room: RoomCode,
    pub word: String,
    pub drawer: Option<PlayerId>,
    pub drawing: Drawing,
}

/// One room's game.
#[derive(Debug)]
pub struct GameState {
    code: RoomCode,
    players: Vec<Player>,
    /// Players who left mid-game. Their scores still count in the results.
    departed: Vec<Player>,
    settings: RoomSettings,
    turn: GameTurn,
    phase: Phase,
    /// 1-based while playing, 0 in the lobby.
    round: u32,
    /// Bumped every time a turn begins; stale timer ticks carry an old value.
    turn_number: u64,
    /// Id of the current drawer, kept even if they leave mid-turn.
    drawer_id: Option<PlayerId>,
    /// Running total of every finished turn's reset score.
    tally: u32,
    used_words: HashSet<String>,
    captures: Vec<Snapshot>,
    final_results: Option<Vec<GameResult>>,
}

impl GameState {
    /// A lobby with no players. `settings` must already be defaulted.
    pub fn new(code: RoomCode, settings: RoomSettings) -> Self {
        Self {
            code,
            players: Vec::new(),
            departed: Vec::new(),
            settings,
            turn: GameTurn::default(),
            phase: Phase::Lobby,
            round: 0,
            turn_number: 0,
            drawer_id: None,
            tally: 0,
            used_words: HashSet::new(),
            captures: Vec::new(),
            final_results: None,
        }
    }

    // -- Accessors --

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }

    pub fn turn(&self) -> &GameTurn {
        &self.turn
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn turn_number(&self) -> u64 {
        self.turn_number
    }

    pub fn tally(&self) -> u32 {
        self.tally
    }

    pub fn drawer_id(&self) -> Option<PlayerId> {
        self.drawer_id
    }

    // -- Membership --

    /// Adds a player to the lobby.
    ///
    /// # Errors
    /// [`GameError::GameInProgress`] outside the lobby,
    /// [`GameError::AlreadyJoined`] for a duplicate id,
    /// [`GameError::RoomFull`] at capacity.
    pub fn add_player(&mut self, player: Player) -> Result<(), GameError> {
        if self.phase != Phase::Lobby {
            return Err(GameError::GameInProgress);
        }
        if self.player(player.id).is_some() {
            return Err(GameError::AlreadyJoined(player.id));
        }
        if self.players.len() >= self.settings.capacity {
            return Err(GameError::RoomFull {
                capacity: self.settings.capacity,
            });
        }
        self.players.push(player);
        Ok(())
    }

    /// Removes a player. If they were drawing, the turn ends early.
    pub fn remove_player(&mut self, id: PlayerId, now: Instant) -> Result<Dispatch, GameError> {
        let idx = self
            .players
            .iter()
            .position(|p| p.id == id)
            .ok_or(GameError::UnknownPlayer(id))?;
        let player = self.players.remove(idx);
        self.turn.remove_guesser(id);
        if self.phase == Phase::Playing {
            self.departed.push(player);
        }

        let mut out = vec![(Recipient::All, Outbound::Leave(LeaveNotice { player: id }))];
        if self.phase != Phase::Playing {
            return Ok(out);
        }

        match self.turn.drawer() {
            // The next player has shifted into the drawer's slot.
            Some(drawer) if drawer == idx => self.end_turn(idx, now, &mut out),
            Some(drawer) => {
                let drawer = if idx < drawer { drawer - 1 } else { drawer };
                self.turn.set_drawer(drawer);
                if self.players.len() < MIN_PLAYERS || self.all_guessed() {
                    self.end_turn(drawer + 1, now, &mut out);
                }
            }
            None => {}
        }
        Ok(out)
    }

    // -- Player actions --

    /// Lobby → Playing. The first turn goes to the first player who joined.
    pub fn start_game(&mut self, sender: PlayerId, now: Instant) -> Result<Dispatch, GameError> {
        self.require_member(sender)?;
        match self.phase {
            Phase::Lobby => {}
            Phase::Playing | Phase::Finished => return Err(GameError::AlreadyStarted),
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers {
                required: MIN_PLAYERS,
                present: self.players.len(),
            });
        }
        if self.settings.word_bank.is_empty() {
            return Err(GameError::EmptyWordBank);
        }

        self.phase = Phase::Playing;
        self.round = 1;
        self.tally = 0;
        self.used_words.clear();
        tracing::info!(room = %self.code, players = self.players.len(), "game started");

        let mut out = Vec::new();
        self.begin_turn(0, now, &mut out);
        Ok(out)
    }

    /// A chat line. While a turn is running this is also a guess.
    pub fn chat(&mut self, sender: PlayerId, text: String, now: Instant) -> Result<Dispatch, GameError> {
        let player = self
            .player(sender)
            .cloned()
            .ok_or(GameError::UnknownPlayer(sender))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(GameError::InvalidText("message is empty".into()));
        }
        if text.chars().count() > MAX_CHAT_LEN {
            return Err(GameError::InvalidText(format!(
                "message is longer than {MAX_CHAT_LEN} characters"
            )));
        }
        let chat = Outbound::Chat(ChatMsg {
            player,
            text: text.to_string(),
        });

        if self.phase != Phase::Playing || !self.turn.is_active() {
            return Ok(vec![(Recipient::All, chat)]);
        }

        // Anyone who knows the word only talks to others who know it.
        if self.turn.has_guessed(sender) {
            return Ok(vec![(Recipient::Players(self.knowers()), chat)]);
        }
        if !self.turn.contains_curr_word(text) {
            return Ok(vec![(Recipient::All, chat)]);
        }
        if self.drawer_id == Some(sender) {
            return Err(GameError::DrawerCannotGuess);
        }

        self.turn.set_guesser(sender);
        let score = match self.players.iter_mut().find(|p| p.id == sender) {
            Some(p) => {
                p.score += GUESS_REWARD;
                p.score
            }
            None => 0,
        };
        tracing::debug!(room = %self.code, player = %sender, "correct guess");

        let mut out = vec![
            (Recipient::Players(self.knowers()), chat),
            (
                Recipient::All,
                Outbound::Score(ScoreMsg {
                    player: sender,
                    score,
                }),
            ),
        ];
        if self.all_guessed() {
            let next = self.turn.drawer().map_or(0, |d| d + 1);
            self.end_turn(next, now, &mut out);
        }
        Ok(out)
    }

    /// A stroke from the drawer, echoed to everyone.
    pub fn draw(&mut self, sender: PlayerId, stroke: Circle) -> Result<Dispatch, GameError> {
        self.require_member(sender)?;
        if self.phase != Phase::Playing {
            return Err(GameError::NotPlaying);
        }
        if self.drawer_id != Some(sender) {
            return Err(GameError::NotDrawer(sender));
        }
        self.turn.draw(stroke)?;
        Ok(vec![(Recipient::All, Outbound::Draw(stroke))])
    }

    /// Timer tick for turn `turn_number`. Ticks for earlier turns do nothing.
    pub fn expire_turn(&mut self, turn_number: u64, now: Instant) -> Dispatch {
        let mut out = Vec::new();
        if self.phase != Phase::Playing || turn_number != self.turn_number {
            tracing::trace!(room = %self.code, turn_number, "stale turn timer");
            return out;
        }
        tracing::debug!(room = %self.code, turn_number, "turn timed out");
        let next = self.turn.drawer().map_or(0, |d| d + 1);
        self.end_turn(next, now, &mut out);
        out
    }

    // -- Views --

    /// What `viewer` should see on joining.
    pub fn snapshot(&self, viewer: PlayerId, now: Instant) -> RoomSnapshot {
        let word = self.turn.curr_word();
        let word = if self.knows_word(viewer) {
            word.to_string()
        } else {
            mask_word(word)
        };
        RoomSnapshot {
            code: self.code.clone(),
            phase: self.phase,
            players: self.players.clone(),
            round: self.round,
            rounds: self.settings.rounds,
            drawer_index: self.turn.drawer(),
            word,
            canvas: self.turn.canvas().to_vec(),
            time_limit_secs: self.settings.time_limit_secs,
            elapsed_secs: self.turn.elapsed(now).as_secs(),
        }
    }

    /// The ranked scoreboard, including players who left mid-game; frozen
    /// once the game has finished.
    pub fn results(&self) -> Vec<GameResult> {
        match &self.final_results {
            Some(results) => results.clone(),
            None => rank(self.players.iter().chain(&self.departed)),
        }
    }

    /// Encodes the current canvas.
    pub fn capture(&self) -> Result<Drawing, GameError> {
        self.turn.capture_drawing()
    }

    /// Drawings of turns that ended since the last call.
    pub fn take_captures(&mut self) -> Vec<Snapshot> {
        std::mem::take(&mut self.captures)
    }

    // -- Turn progression --

    fn begin_turn(&mut self, drawer: usize, now: Instant, out: &mut Dispatch) {
        let word = self.pick_word();
        let drawer_id = self.players[drawer].id;
        self.turn.begin(word.clone(), drawer, now);
        self.drawer_id = Some(drawer_id);
        self.turn_number += 1;
        tracing::debug!(
            room = %self.code,
            round = self.round,
            turn = self.turn_number,
            drawer = %drawer_id,
            "turn started"
        );

        let masked = mask_word(&word);
        out.push((
            Recipient::Player(drawer_id),
            Outbound::Begin(BeginMsg {
                next_word: word,
                next_player_index: drawer,
            }),
        ));
        out.push((
            Recipient::AllExcept(drawer_id),
            Outbound::Begin(BeginMsg {
                next_word: masked,
                next_player_index: drawer,
            }),
        ));
    }

    /// Scores and closes the current turn, then moves on to `next`.
    fn end_turn(&mut self, next: usize, now: Instant, out: &mut Dispatch) {
        self.tally += self.turn.calc_reset_score();
        let word = self.turn.curr_word().to_string();

        if !self.turn.canvas().is_empty() {
            match self.turn.capture_drawing() {
                Ok(drawing) => self.captures.push(Snapshot {
                    room: self.code.clone(),
                    word: word.clone(),
                    drawer: self.drawer_id,
                    drawing,
                }),
                Err(e) => {
                    tracing::warn!(room = %self.code, error = %e, "turn capture failed");
                }
            }
        }

        out.push((
            Recipient::All,
            Outbound::End(EndMsg {
                word,
                tally: self.tally,
            }),
        ));
        self.advance(next, now, out);
    }

    /// Round-robins to drawer `next`, wrapping into the next round.
    fn advance(&mut self, next: usize, now: Instant, out: &mut Dispatch) {
        if self.players.len() < MIN_PLAYERS {
            self.finish(out);
            return;
        }
        let mut next = next;
        if next >= self.players.len() {
            next = 0;
            self.round += 1;
            self.used_words.clear();
        }
        if self.round > self.settings.rounds {
            self.finish(out);
            return;
        }
        self.begin_turn(next, now, out);
    }

    fn finish(&mut self, out: &mut Dispatch) {
        self.phase = Phase::Finished;
        self.turn.close();
        self.turn.clear_canvas();
        self.drawer_id = None;
        let results = rank(self.players.iter().chain(&self.departed));
        self.final_results = Some(results.clone());
        tracing::info!(room = %self.code, tally = self.tally, "game finished");
        out.push((Recipient::All, Outbound::Finish(FinishMsg { results })));
    }

    /// Random word, avoiding this round's words while the bank allows.
    fn pick_word(&mut self) -> String {
        let bank = &self.settings.word_bank;
        let fresh: Vec<&String> = bank.iter().filter(|w| !self.used_words.contains(*w)).collect();
        let pool: Vec<&String> = if fresh.is_empty() {
            bank.iter().collect()
        } else {
            fresh
        };
        let word = pool
            .choose(&mut rand::rng())
            .map(|w| (*w).clone())
            .unwrap_or_default();
        self.used_words.insert(word.clone());
        word
    }

    // -- Helpers --

    fn require_member(&self, id: PlayerId) -> Result<(), GameError> {
        match self.player(id) {
            Some(_) => Ok(()),
            None => Err(GameError::UnknownPlayer(id)),
        }
    }

    /// Every non-drawer has guessed (and there is at least one).
    fn all_guessed(&self) -> bool {
        let mut guessers = self
            .players
            .iter()
            .filter(|p| Some(p.id) != self.drawer_id)
            .peekable();
        guessers.peek().is_some() && guessers.all(|p| self.turn.has_guessed(p.id))
    }

    fn knows_word(&self, id: PlayerId) -> bool {
        self.drawer_id == Some(id) || self.turn.has_guessed(id)
    }

    /// Drawer first, then guessers in id order.
    fn knowers(&self) -> Vec<PlayerId> {
        let mut guessers: Vec<PlayerId> = self.turn.guessers().collect();
        guessers.sort();
        self.drawer_id.into_iter().chain(guessers).collect()
    }
}

/// Hides a word from players who haven't guessed it.
pub fn mask_word(word: &str) -> String {
    word.chars()
        .map(|c| if c.is_whitespace() { c } else { '_' })
        .collect()
}

/// Highest score first. Ties share a rank and the next rank skips ahead.
fn rank<'a>(players: impl IntoIterator<Item = &'a Player>) -> Vec<GameResult> {
    let mut sorted: Vec<&Player> = players.into_iter().collect();
    sorted.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));

    let mut results: Vec<GameResult> = Vec::with_capacity(sorted.len());
    for (i, p) in sorted.into_iter().enumerate() {
        let rank = match results.last() {
            Some(prev) if prev.score == p.score => prev.rank,
            _ => i + 1,
        };
        results.push(GameResult {
            player: p.id,
            name: p.name.clone(),
            score: p.score,
            rank,
        });
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::with_defaults;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn settings(words: &[&str], rounds: u32) -> RoomSettings {
        with_defaults(RoomSettings {
            word_bank: words.iter().map(|w| w.to_string()).collect(),
            rounds,
            ..RoomSettings::default()
        })
    }

    fn game_with(words: &[&str], rounds: u32, players: u64) -> GameState {
        let mut game = GameState::new(RoomCode::new("123abc"), settings(words, rounds));
        for id in 1..=players {
            game.add_player(Player::new(pid(id), format!("p{id}"))).unwrap();
        }
        game
    }

    fn stroke() -> Circle {
        Circle { x: 10, y: 10, color: 1, radius: 2, connected: false }
    }

    fn has(out: &Dispatch, recipient: &Recipient, msg: &Outbound) -> bool {
        out.iter().any(|(r, m)| r == recipient && m == msg)
    }

    fn begin(word: &str, index: usize) -> Outbound {
        Outbound::Begin(BeginMsg {
            next_word: word.into(),
            next_player_index: index,
        })
    }

    // =====================================================================
    // Joining
    // =====================================================================

    #[test]
    fn test_add_player_rejects_duplicates_and_overflow() {
        let mut game = GameState::new(
            RoomCode::new("r"),
            with_defaults(RoomSettings { capacity: 2, ..RoomSettings::default() }),
        );
        game.add_player(Player::new(pid(1), "a")).unwrap();
        assert_eq!(
            game.add_player(Player::new(pid(1), "a")),
            Err(GameError::AlreadyJoined(pid(1)))
        );
        game.add_player(Player::new(pid(2), "b")).unwrap();
        assert_eq!(
            game.add_player(Player::new(pid(3), "c")),
            Err(GameError::RoomFull { capacity: 2 })
        );
    }

    #[test]
    fn test_add_player_rejected_while_playing() {
        let mut game = game_with(&["Word"], 1, 2);
        game.start_game(pid(1), Instant::now()).unwrap();
        assert_eq!(
            game.add_player(Player::new(pid(9), "late")),
            Err(GameError::GameInProgress)
        );
        assert_eq!(game.players().len(), 2);
    }

    // =====================================================================
    // Starting
    // =====================================================================

    #[test]
    fn test_start_requires_two_players() {
        let mut game = game_with(&["Word"], 1, 1);
        let err = game.start_game(pid(1), Instant::now()).unwrap_err();
        assert_eq!(err, GameError::NotEnoughPlayers { required: 2, present: 1 });
        assert_eq!(game.phase(), Phase::Lobby);
    }

    #[test]
    fn test_start_requires_word_bank() {
        // Bypass defaulting to get an empty bank.
        let mut game = GameState::new(
            RoomCode::new("r"),
            RoomSettings { rounds: 1, capacity: 4, ..RoomSettings::default() },
        );
        game.add_player(Player::new(pid(1), "a")).unwrap();
        game.add_player(Player::new(pid(2), "b")).unwrap();
        assert_eq!(
            game.start_game(pid(1), Instant::now()),
            Err(GameError::EmptyWordBank)
        );
        assert_eq!(game.phase(), Phase::Lobby);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut game = game_with(&["Word"], 1, 2);
        game.start_game(pid(1), Instant::now()).unwrap();
        assert_eq!(
            game.start_game(pid(2), Instant::now()),
            Err(GameError::AlreadyStarted)
        );
    }

    #[test]
    fn test_start_from_non_member_is_rejected() {
        let mut game = game_with(&["Word"], 1, 2);
        assert_eq!(
            game.start_game(pid(99), Instant::now()),
            Err(GameError::UnknownPlayer(pid(99)))
        );
    }

    #[test]
    fn test_start_sends_word_to_drawer_and_mask_to_others() {
        let mut game = game_with(&["Word"], 1, 3);
        let out = game.start_game(pid(1), Instant::now()).unwrap();

        assert_eq!(game.phase(), Phase::Playing);
        assert_eq!(game.round(), 1);
        assert_eq!(game.turn().drawer(), Some(0));
        assert_eq!(game.turn().curr_word(), "Word");
        assert!(has(&out, &Recipient::Player(pid(1)), &begin("Word", 0)));
        assert!(has(&out, &Recipient::AllExcept(pid(1)), &begin("____", 0)));
    }

    // =====================================================================
    // Scenario: one guesser, then timeout
    // =====================================================================

    #[test]
    fn test_correct_guess_then_timeout_adds_fifty_to_tally() {
        let now = Instant::now();
        let mut game = game_with(&["Word"], 1, 3);
        game.start_game(pid(1), now).unwrap();

        let out = game.chat(pid(2), "I think it's Word".into(), now).unwrap();
        assert!(game.turn().has_guessed(pid(2)));
        assert_eq!(game.player(pid(2)).unwrap().score, 50);
        assert!(has(
            &out,
            &Recipient::All,
            &Outbound::Score(ScoreMsg { player: pid(2), score: 50 })
        ));
        // The echo only reaches people who know the word.
        assert!(out.iter().any(|(r, m)| {
            *r == Recipient::Players(vec![pid(1), pid(2)]) && matches!(m, Outbound::Chat(_))
        }));
        // C hasn't guessed, so the turn is still running.
        assert_eq!(game.turn().drawer(), Some(0));

        let out = game.expire_turn(game.turn_number(), now);
        assert_eq!(game.tally(), 50);
        assert!(has(
            &out,
            &Recipient::All,
            &Outbound::End(EndMsg { word: "Word".into(), tally: 50 })
        ));
        assert_eq!(game.turn().drawer(), Some(1));
        assert_eq!(game.turn().guesser_count(), 0);
    }

    #[test]
    fn test_repeat_guess_scores_once() {
        let now = Instant::now();
        let mut game = game_with(&["Word"], 1, 3);
        game.start_game(pid(1), now).unwrap();

        game.chat(pid(2), "Word".into(), now).unwrap();
        let out = game.chat(pid(2), "Word again".into(), now).unwrap();

        assert_eq!(game.player(pid(2)).unwrap().score, 50);
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], (Recipient::Players(_), Outbound::Chat(_))));
    }

    #[test]
    fn test_near_miss_is_plain_chat() {
        let now = Instant::now();
        let mut game = game_with(&["Word"], 1, 3);
        game.start_game(pid(1), now).unwrap();

        let out = game.chat(pid(2), "Words".into(), now).unwrap();
        assert!(!game.turn().has_guessed(pid(2)));
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], (Recipient::All, Outbound::Chat(_))));
    }

    #[test]
    fn test_drawer_cannot_say_the_word() {
        let now = Instant::now();
        let mut game = game_with(&["Word"], 1, 2);
        game.start_game(pid(1), now).unwrap();

        assert_eq!(
            game.chat(pid(1), "it's a Word".into(), now),
            Err(GameError::DrawerCannotGuess)
        );
        assert_eq!(game.turn().guesser_count(), 0);
    }

    #[test]
    fn test_chat_validation() {
        let now = Instant::now();
        let mut game = game_with(&["Word"], 1, 2);
        assert!(matches!(
            game.chat(pid(1), "   ".into(), now),
            Err(GameError::InvalidText(_))
        ));
        assert!(matches!(
            game.chat(pid(1), "x".repeat(MAX_CHAT_LEN + 1), now),
            Err(GameError::InvalidText(_))
        ));
        assert_eq!(
            game.chat(pid(7), "hi".into(), now),
            Err(GameError::UnknownPlayer(pid(7)))
        );
    }

    #[test]
    fn test_lobby_chat_is_broadcast() {
        let mut game = game_with(&["Word"], 1, 2);
        let out = game.chat(pid(1), " Hello 123 ".into(), Instant::now()).unwrap();
        assert_eq!(
            out,
            vec![(
                Recipient::All,
                Outbound::Chat(ChatMsg {
                    player: Player::new(pid(1), "p1"),
                    text: "Hello 123".into(),
                })
            )]
        );
    }

    #[test]
    fn test_everyone_guessing_ends_turn_early() {
        let now = Instant::now();
        let mut game = game_with(&["Word"], 2, 3);
        game.start_game(pid(1), now).unwrap();
        let first_turn = game.turn_number();

        game.chat(pid(2), "Word".into(), now).unwrap();
        let out = game.chat(pid(3), "Word".into(), now).unwrap();

        assert_eq!(game.tally(), 100);
        assert_eq!(game.turn_number(), first_turn + 1);
        assert_eq!(game.turn().drawer(), Some(1));
        assert!(has(&out, &Recipient::Player(pid(2)), &begin("Word", 1)));
    }

    // =====================================================================
    // Drawing
    // =====================================================================

    #[test]
    fn test_drawer_stroke_is_echoed_to_all() {
        let mut game = game_with(&["Word"], 1, 3);
        game.start_game(pid(1), Instant::now()).unwrap();

        let out = game.draw(pid(1), stroke()).unwrap();
        assert_eq!(out, vec![(Recipient::All, Outbound::Draw(stroke()))]);
        assert_eq!(game.turn().canvas(), &[stroke()]);
    }

    #[test]
    fn test_non_drawer_stroke_is_rejected() {
        let mut game = game_with(&["Word"], 1, 3);
        game.start_game(pid(1), Instant::now()).unwrap();
        game.draw(pid(1), stroke()).unwrap();

        assert_eq!(game.draw(pid(2), stroke()), Err(GameError::NotDrawer(pid(2))));
        assert_eq!(game.turn().canvas().len(), 1);
    }

    #[test]
    fn test_draw_in_lobby_is_rejected() {
        let mut game = game_with(&["Word"], 1, 2);
        assert_eq!(game.draw(pid(1), stroke()), Err(GameError::NotPlaying));
    }

    #[test]
    fn test_finished_turn_drawing_is_captured() {
        let now = Instant::now();
        let mut game = game_with(&["Word"], 1, 2);
        game.start_game(pid(1), now).unwrap();
        game.draw(pid(1), stroke()).unwrap();
        game.draw(pid(1), Circle { connected: true, ..stroke() }).unwrap();

        game.expire_turn(game.turn_number(), now);
        let captures = game.take_captures();
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].word, "Word");
        assert_eq!(captures[0].drawer, Some(pid(1)));
        assert_eq!(
            captures[0].drawing.strokes().unwrap(),
            vec![stroke(), Circle { connected: true, ..stroke() }]
        );
        // Taken once.
        assert!(game.take_captures().is_empty());
        // New turn, clean canvas.
        assert!(game.turn().canvas().is_empty());
    }

    // =====================================================================
    // Turn progression and finishing
    // =====================================================================

    #[test]
    fn test_stale_timer_is_ignored() {
        let now = Instant::now();
        let mut game = game_with(&["Word"], 2, 2);
        game.start_game(pid(1), now).unwrap();
        let stale = game.turn_number();
        game.expire_turn(stale, now);
        let current = game.turn_number();

        assert!(game.expire_turn(stale, now).is_empty());
        assert_eq!(game.turn_number(), current);
    }

    #[test]
    fn test_rounds_run_out_and_game_finishes() {
        let now = Instant::now();
        let mut game = game_with(&["Word"], 1, 2);
        game.start_game(pid(1), now).unwrap();
        game.chat(pid(2), "Word".into(), now).unwrap(); // ends turn 1
        assert_eq!(game.turn().drawer(), Some(1));

        let out = game.expire_turn(game.turn_number(), now);
        assert_eq!(game.phase(), Phase::Finished);
        assert_eq!(game.turn().drawer(), None);

        let results = game.results();
        assert_eq!(results[0].player, pid(2));
        assert_eq!(results[0].score, 50);
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[1].rank, 2);
        assert!(has(&out, &Recipient::All, &Outbound::Finish(FinishMsg { results })));

        // Terminal: no restart, no drawing, timers are no-ops.
        assert_eq!(game.start_game(pid(1), now), Err(GameError::AlreadyStarted));
        assert_eq!(game.draw(pid(1), stroke()), Err(GameError::NotPlaying));
        assert!(game.expire_turn(game.turn_number(), now).is_empty());
    }

    #[test]
    fn test_each_player_draws_once_per_round() {
        let now = Instant::now();
        let mut game = game_with(&["a", "b", "c"], 2, 3);
        game.start_game(pid(1), now).unwrap();

        let mut drawers = Vec::new();
        while game.phase() == Phase::Playing {
            drawers.push((game.round(), game.turn().drawer().unwrap()));
            game.expire_turn(game.turn_number(), now);
        }
        assert_eq!(drawers, vec![(1, 0), (1, 1), (1, 2), (2, 0), (2, 1), (2, 2)]);
    }

    #[test]
    fn test_words_do_not_repeat_within_a_round() {
        let now = Instant::now();
        let mut game = game_with(&["a", "b", "c"], 1, 3);
        game.start_game(pid(1), now).unwrap();

        let mut words = HashSet::new();
        while game.phase() == Phase::Playing {
            words.insert(game.turn().curr_word().to_string());
            game.expire_turn(game.turn_number(), now);
        }
        assert_eq!(words.len(), 3);
    }

    #[test]
    fn test_small_bank_repeats_once_exhausted() {
        let now = Instant::now();
        let mut game = game_with(&["Word"], 1, 3);
        game.start_game(pid(1), now).unwrap();
        game.expire_turn(game.turn_number(), now);
        assert_eq!(game.turn().curr_word(), "Word");
    }

    // =====================================================================
    // Leaving mid-game
    // =====================================================================

    #[test]
    fn test_drawer_leaving_ends_turn() {
        let now = Instant::now();
        let mut game = game_with(&["Word"], 1, 3);
        game.start_game(pid(1), now).unwrap();
        let turn = game.turn_number();

        let out = game.remove_player(pid(1), now).unwrap();
        assert!(has(
            &out,
            &Recipient::All,
            &Outbound::Leave(LeaveNotice { player: pid(1) })
        ));
        assert!(out.iter().any(|(_, m)| matches!(m, Outbound::End(_))));
        assert_eq!(game.turn_number(), turn + 1);
        // Player 2 shifted into slot 0 and draws next.
        assert_eq!(game.turn().drawer(), Some(0));
        assert_eq!(game.drawer_id(), Some(pid(2)));
        assert_eq!(game.round(), 1);
    }

    #[test]
    fn test_last_slot_drawer_leaving_wraps_round() {
        let now = Instant::now();
        let mut game = game_with(&["Word"], 2, 3);
        game.start_game(pid(1), now).unwrap();
        game.expire_turn(game.turn_number(), now);
        game.expire_turn(game.turn_number(), now);
        assert_eq!(game.drawer_id(), Some(pid(3)));

        game.remove_player(pid(3), now).unwrap();
        assert_eq!(game.round(), 2);
        assert_eq!(game.drawer_id(), Some(pid(1)));
    }

    #[test]
    fn test_earlier_player_leaving_keeps_drawer() {
        let now = Instant::now();
        let mut game = game_with(&["Word"], 1, 3);
        game.start_game(pid(1), now).unwrap();
        game.expire_turn(game.turn_number(), now);
        assert_eq!(game.drawer_id(), Some(pid(2)));
        let turn = game.turn_number();

        game.remove_player(pid(1), now).unwrap();
        assert_eq!(game.turn_number(), turn);
        assert_eq!(game.turn().drawer(), Some(0));
        assert_eq!(game.drawer_id(), Some(pid(2)));
        // Indices stay consistent: the drawer can still draw.
        game.draw(pid(2), stroke()).unwrap();
    }

    #[test]
    fn test_last_holdout_leaving_ends_turn() {
        let now = Instant::now();
        let mut game = game_with(&["Word"], 2, 3);
        game.start_game(pid(1), now).unwrap();
        game.chat(pid(2), "Word".into(), now).unwrap();
        let turn = game.turn_number();

        game.remove_player(pid(3), now).unwrap();
        assert_eq!(game.tally(), 50);
        assert_eq!(game.turn_number(), turn + 1);
    }

    #[test]
    fn test_too_few_players_finishes_game() {
        let now = Instant::now();
        let mut game = game_with(&["Word"], 3, 2);
        game.start_game(pid(1), now).unwrap();

        let out = game.remove_player(pid(2), now).unwrap();
        assert_eq!(game.phase(), Phase::Finished);
        assert!(out.iter().any(|(_, m)| matches!(m, Outbound::Finish(_))));
    }

    #[test]
    fn test_leaving_guesser_is_removed_from_guessers() {
        let now = Instant::now();
        let mut game = game_with(&["Word"], 1, 4);
        game.start_game(pid(1), now).unwrap();
        game.chat(pid(2), "Word".into(), now).unwrap();

        game.remove_player(pid(2), now).unwrap();
        assert!(!game.turn().has_guessed(pid(2)));
        assert_eq!(game.turn().calc_reset_score(), 0);
    }

    #[test]
    fn test_departed_scorer_stays_in_results() {
        let now = Instant::now();
        let mut game = game_with(&["Word"], 1, 3);
        game.start_game(pid(1), now).unwrap();
        game.chat(pid(2), "Word".into(), now).unwrap();

        game.remove_player(pid(2), now).unwrap();
        let out = game.remove_player(pid(3), now).unwrap();
        assert_eq!(game.phase(), Phase::Finished);

        let results = game.results();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].player, pid(2));
        assert_eq!(results[0].score, 50);
        assert_eq!(results[0].rank, 1);
        assert!(out.iter().any(|(_, m)| {
            matches!(m, Outbound::Finish(f) if f.results == results)
        }));

        // Leaving after the finish doesn't change the frozen scoreboard.
        game.remove_player(pid(1), now).unwrap();
        assert_eq!(game.results(), results);
    }

    #[test]
    fn test_lobby_leaver_is_not_ranked() {
        let mut game = game_with(&["Word"], 1, 3);
        game.remove_player(pid(3), Instant::now()).unwrap();
        let ids: Vec<PlayerId> = game.results().iter().map(|r| r.player).collect();
        assert_eq!(ids, vec![pid(1), pid(2)]);
    }

    #[test]
    fn test_unknown_player_leaving_is_error() {
        let mut game = game_with(&["Word"], 1, 2);
        assert_eq!(
            game.remove_player(pid(5), Instant::now()),
            Err(GameError::UnknownPlayer(pid(5)))
        );
    }

    // =====================================================================
    // Views
    // =====================================================================

    #[test]
    fn test_snapshot_masks_word_for_guessers_only() {
        let now = Instant::now();
        let mut game = game_with(&["Word"], 1, 3);
        game.start_game(pid(1), now).unwrap();
        game.draw(pid(1), stroke()).unwrap();

        assert_eq!(game.snapshot(pid(1), now).word, "Word");
        assert_eq!(game.snapshot(pid(2), now).word, "____");
        game.chat(pid(2), "Word".into(), now).unwrap();
        assert_eq!(game.snapshot(pid(2), now).word, "Word");

        let snap = game.snapshot(pid(3), now);
        assert_eq!(snap.phase, Phase::Playing);
        assert_eq!(snap.drawer_index, Some(0));
        assert_eq!(snap.canvas, vec![stroke()]);
        assert_eq!(snap.players.len(), 3);
    }

    #[test]
    fn test_mask_word_keeps_length() {
        assert_eq!(mask_word("Word"), "____");
        assert_eq!(mask_word(""), "");
        assert_eq!(mask_word("ñandú"), "_____");
    }

    #[test]
    fn test_rank_ties_share_rank() {
        let players = vec![
            Player { id: pid(1), name: "a".into(), score: 50 },
            Player { id: pid(2), name: "b".into(), score: 100 },
            Player { id: pid(3), name: "c".into(), score: 50 },
            Player { id: pid(4), name: "d".into(), score: 0 },
        ];
        let ranks: Vec<(u64, usize)> = rank(&players).iter().map(|r| (r.player.0, r.rank)).collect();
        assert_eq!(ranks, vec![(2, 1), (1, 2), (3, 2), (4, 4)]);
    }
}
