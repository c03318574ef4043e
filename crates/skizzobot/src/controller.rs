//! Channel event handling.
//!
//! The [`Controller`] turns chat events into actions: it learns every channel
//! line, answers when triggered, greets joiners, rejoins after a kick and
//! settles scores once it gets operator status. It never talks to a network
//! itself; a [`Transport`] feeds it events and carries its actions out.

use std::collections::BTreeSet;
use std::io;
use std::time::{Duration, Instant};

use chat_tokenizer::{strip_address, tokenize};
use rand::Rng;
use rand::seq::IndexedRandom;
use thiserror::Error;
use tracing::{debug, info, warn};
use triplet_chain::learn;
use triplet_store::TripletStore;

use crate::brain::Brain;
use crate::config::BotConfig;
use crate::engine::{Settings, compose_reply};

/// Something that happened on the chat network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The connection is up; time to join channels.
    Connected,
    Message {
        sender: String,
        channel: String,
        text: String,
    },
    Join {
        nick: String,
        channel: String,
    },
    Kick {
        kicker: String,
        kicked: String,
        channel: String,
    },
    Mode {
        setter: String,
        channel: String,
        changes: Vec<ModeChange>,
    },
    /// The operator asked the bot to forget what `channel` taught it.
    Reset {
        channel: String,
    },
}

/// Something the bot wants done on the chat network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Join {
        channel: String,
    },
    Say {
        channel: String,
        text: String,
    },
    Kick {
        channel: String,
        nick: String,
        reason: String,
    },
}

/// A single channel mode change, e.g. `+o alice`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeChange {
    pub adding: bool,
    pub mode: char,
    pub target: Option<String>,
}

/// Channel modes that consume an argument.
const MODES_WITH_ARGUMENT: &str = "bklvohq";

/// Parse a raw channel mode string such as `"+o-v alice bob"`.
///
/// Modes in `bklvohq` take the next argument in order; a missing argument
/// leaves the target empty. Unknown characters are kept as modes without an
/// argument.
pub fn parse_channel_modes(raw: &str) -> Vec<ModeChange> {
    let mut parts = raw.split_whitespace();
    let Some(modes) = parts.next() else {
        return Vec::new();
    };

    let mut adding = true;
    let mut changes = Vec::new();
    for mode in modes.chars() {
        match mode {
            '+' => adding = true,
            '-' => adding = false,
            _ => {
                let target = if MODES_WITH_ARGUMENT.contains(mode) {
                    parts.next().map(str::to_string)
                } else {
                    None
                };
                changes.push(ModeChange {
                    adding,
                    mode,
                    target,
                });
            }
        }
    }
    changes
}

/// Whether `name` looks like a channel rather than a nick.
fn is_channel(name: &str) -> bool {
    name.starts_with(['#', '&', '+', '!'])
}

/// Errors from moving events and actions over a transport.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("transport protocol error: {0}")]
    Protocol(String),
}

/// Source of events and sink of actions.
pub trait Transport {
    /// The next event, or `None` once the transport is exhausted.
    fn receive(&mut self) -> Result<Option<Event>, TransportError>;

    fn send(&mut self, action: &Action) -> Result<(), TransportError>;
}

/// Pick one template at random; `None` for an empty list.
fn pick<'a, R: Rng>(templates: &'a [String], rng: &mut R) -> Option<&'a str> {
    templates.choose(rng).map(String::as_str)
}

/// Collapse a reply onto one line.
fn one_line(text: &str) -> String {
    text.replace('\n', " ").replace('\r', "")
}

/// Event-driven dialogue controller over a per-channel [`Brain`].
pub struct Controller<S, R> {
    config: BotConfig,
    settings: Settings,
    triggers: Vec<String>,
    join_cooldown: Duration,
    brain: Brain<S>,
    rng: R,
    revenge: BTreeSet<String>,
    last_join: Option<Instant>,
}

impl<S: TripletStore + Default, R: Rng> Controller<S, R> {
    pub fn new(config: BotConfig, brain: Brain<S>, rng: R) -> Self {
        Controller {
            settings: config.settings(),
            triggers: config.triggers(),
            join_cooldown: config.join_cooldown(),
            config,
            brain,
            rng,
            revenge: BTreeSet::new(),
            last_join: None,
        }
    }

    pub fn nick(&self) -> &str {
        &self.config.user.nick
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn brain(&self) -> &Brain<S> {
        &self.brain
    }

    pub fn brain_mut(&mut self) -> &mut Brain<S> {
        &mut self.brain
    }

    pub fn into_brain(self) -> Brain<S> {
        self.brain
    }

    /// Nicks that kicked the bot and have not been kicked back yet.
    pub fn revenge_list(&self) -> impl Iterator<Item = &str> {
        self.revenge.iter().map(String::as_str)
    }

    /// Feed events from `transport` until it runs dry, sending every action.
    ///
    /// Each event is fully handled, learning included, before the next one is
    /// received.
    pub fn run<T: Transport>(&mut self, transport: &mut T) -> Result<(), TransportError> {
        while let Some(event) = transport.receive()? {
            for action in self.handle(event) {
                transport.send(&action)?;
            }
        }
        Ok(())
    }

    /// Handle one event now.
    pub fn handle(&mut self, event: Event) -> Vec<Action> {
        self.handle_at(event, Instant::now())
    }

    /// Handle one event observed at `now`.
    pub fn handle_at(&mut self, event: Event, now: Instant) -> Vec<Action> {
        match event {
            Event::Connected => self.on_connected(),
            Event::Message {
                sender,
                channel,
                text,
            } => self.on_message(&sender, &channel, &text),
            Event::Join { nick, channel } => self.on_join(&nick, &channel, now),
            Event::Kick {
                kicker,
                kicked,
                channel,
            } => self.on_kick(&kicker, &kicked, &channel),
            Event::Mode {
                setter,
                channel,
                changes,
            } => self.on_mode(&setter, &channel, &changes),
            Event::Reset { channel } => {
                self.on_reset(&channel);
                Vec::new()
            }
        }
    }

    fn on_reset(&mut self, channel: &str) {
        match self.brain.reset(channel) {
            Ok(true) => {}
            Ok(false) => debug!(channel, "nothing to reset"),
            Err(err) => warn!(channel, error = %err, "reset failed"),
        }
    }

    fn on_connected(&mut self) -> Vec<Action> {
        self.config
            .channels
            .active
            .iter()
            .filter(|name| is_channel(name))
            .map(|channel| {
                info!(channel = channel.as_str(), "joining channel");
                Action::Join {
                    channel: channel.clone(),
                }
            })
            .collect()
    }

    fn on_message(&mut self, sender: &str, channel: &str, text: &str) -> Vec<Action> {
        let words = tokenize(text);
        let content = strip_address(&words, &self.config.user.nick);
        let triggered = self
            .triggers
            .iter()
            .any(|t| !t.is_empty() && text.contains(t.as_str()));

        let store = self.brain.channel_mut(channel);
        if let Err(err) = learn(store, content) {
            warn!(channel, sender, error = %err, "dropping line, store failed");
            return Vec::new();
        }
        if !triggered {
            return Vec::new();
        }

        match compose_reply(&*store, content, text, &self.settings, &mut self.rng) {
            Ok(reply) => {
                debug!(channel, sender, ?reply, "replying");
                vec![Action::Say {
                    channel: channel.to_string(),
                    text: one_line(reply.text()),
                }]
            }
            Err(err) => {
                warn!(channel, sender, error = %err, "no reply, store failed");
                Vec::new()
            }
        }
    }

    fn on_join(&mut self, nick: &str, channel: &str, now: Instant) -> Vec<Action> {
        let mut actions = Vec::new();
        if nick == self.config.user.nick {
            if let Some(hello) = pick(&self.config.messages.hello_channel, &mut self.rng) {
                actions.push(say(channel, hello.to_string()));
            }
            return actions;
        }

        let quiet = self
            .last_join
            .is_none_or(|last| now.saturating_duration_since(last) >= self.join_cooldown);
        if quiet {
            if let Some(hello) = pick(&self.config.messages.hello_user, &mut self.rng) {
                actions.push(say(channel, format!("{nick}: {hello}")));
            }
        } else {
            debug!(nick, channel, "join within cooldown, not greeting");
        }
        self.last_join = Some(now);
        actions
    }

    fn on_kick(&mut self, kicker: &str, kicked: &str, channel: &str) -> Vec<Action> {
        if kicked != self.config.user.nick {
            return Vec::new();
        }

        info!(channel, kicker, "kicked, rejoining");
        let mut actions = vec![Action::Join {
            channel: channel.to_string(),
        }];
        if let Some(revenge) = pick(&self.config.messages.revenge, &mut self.rng) {
            actions.push(say(channel, format!("{kicker}: {revenge}")));
        }
        self.revenge.insert(kicker.to_string());
        actions
    }

    fn on_mode(&mut self, setter: &str, channel: &str, changes: &[ModeChange]) -> Vec<Action> {
        let nick = self.config.user.nick.as_str();
        let status = changes
            .iter()
            .rev()
            .find(|c| c.mode == 'o' && c.target.as_deref() == Some(nick))
            .map(|c| c.adding);

        let mut actions = Vec::new();
        match status {
            Some(true) => {
                if let Some(thanks) = pick(&self.config.messages.thanks, &mut self.rng) {
                    actions.push(say(channel, format!("{setter}: {thanks}")));
                }
                actions.extend(self.apply_revenge(channel));
            }
            Some(false) => {
                if let Some(sad) = pick(&self.config.messages.disappointment, &mut self.rng) {
                    actions.push(say(channel, format!("{setter}: {sad}")));
                }
            }
            None => {}
        }
        actions
    }

    /// Kick everyone on the revenge list and forget them.
    fn apply_revenge(&mut self, channel: &str) -> Vec<Action> {
        let targets = std::mem::take(&mut self.revenge);
        targets
            .into_iter()
            .map(|nick| {
                let reason = pick(&self.config.messages.kick, &mut self.rng)
                    .unwrap_or_default()
                    .to_string();
                info!(channel, nick = nick.as_str(), "taking revenge");
                Action::Kick {
                    channel: channel.to_string(),
                    nick,
                    reason,
                }
            })
            .collect()
    }
}

fn say(channel: &str, text: String) -> Action {
    Action::Say {
        channel: channel.to_string(),
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use token_core::Token;
    use triplet_store::{Candidate, Candidates, Direction, Key, MemoryStore, StoreError};

    type TestController = Controller<MemoryStore, SmallRng>;

    fn controller() -> TestController {
        controller_with(BotConfig::default())
    }

    fn controller_with(config: BotConfig) -> TestController {
        Controller::new(config, Brain::new(), SmallRng::seed_from_u64(7))
    }

    fn message(sender: &str, channel: &str, text: &str) -> Event {
        Event::Message {
            sender: sender.to_string(),
            channel: channel.to_string(),
            text: text.to_string(),
        }
    }

    fn join(nick: &str) -> Event {
        Event::Join {
            nick: nick.to_string(),
            channel: "#skizzo".to_string(),
        }
    }

    fn kick(kicker: &str, kicked: &str) -> Event {
        Event::Kick {
            kicker: kicker.to_string(),
            kicked: kicked.to_string(),
            channel: "#skizzo".to_string(),
        }
    }

    fn mode(setter: &str, raw: &str) -> Event {
        Event::Mode {
            setter: setter.to_string(),
            channel: "#skizzo".to_string(),
            changes: parse_channel_modes(raw),
        }
    }

    fn said(channel: &str, text: &str) -> Action {
        say(channel, text.to_string())
    }

    fn joined(channel: &str) -> Action {
        Action::Join {
            channel: channel.to_string(),
        }
    }

    fn kicked(nick: &str) -> Action {
        Action::Kick {
            channel: "#skizzo".to_string(),
            nick: nick.to_string(),
            reason: "Revenge!".to_string(),
        }
    }

    fn change(adding: bool, mode: char, target: Option<&str>) -> ModeChange {
        ModeChange {
            adding,
            mode,
            target: target.map(str::to_string),
        }
    }

    /// A store whose backend is always down.
    #[derive(Default)]
    struct FailingStore;

    impl TripletStore for FailingStore {
        fn increment(&mut self, _: Direction, _: &Key, _: &Token) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }

        fn get(&self, _: Direction, _: &Key) -> Result<Option<Candidates>, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }

        fn anchors(&self, _: &str) -> Result<Vec<Candidate>, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }

        fn starters(&self) -> Result<Vec<Candidate>, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }

        fn reset(&mut self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    /// A store that learns but cannot be read back.
    #[derive(Default)]
    struct WriteOnlyStore(MemoryStore);

    impl TripletStore for WriteOnlyStore {
        fn increment(
            &mut self,
            direction: Direction,
            key: &Key,
            token: &Token,
        ) -> Result<(), StoreError> {
            self.0.increment(direction, key, token)
        }

        fn get(&self, _: Direction, _: &Key) -> Result<Option<Candidates>, StoreError> {
            Err(StoreError::Unavailable("read replica down".into()))
        }

        fn anchors(&self, _: &str) -> Result<Vec<Candidate>, StoreError> {
            Err(StoreError::Unavailable("read replica down".into()))
        }

        fn starters(&self) -> Result<Vec<Candidate>, StoreError> {
            Err(StoreError::Unavailable("read replica down".into()))
        }

        fn reset(&mut self) -> Result<(), StoreError> {
            self.0.reset()
        }
    }

    struct ScriptedTransport {
        events: VecDeque<Event>,
        sent: Vec<Action>,
    }

    impl ScriptedTransport {
        fn new(events: Vec<Event>) -> Self {
            ScriptedTransport {
                events: events.into(),
                sent: Vec::new(),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn receive(&mut self) -> Result<Option<Event>, TransportError> {
            Ok(self.events.pop_front())
        }

        fn send(&mut self, action: &Action) -> Result<(), TransportError> {
            self.sent.push(action.clone());
            Ok(())
        }
    }

    // --- mode parsing ---

    #[test]
    fn parse_modes_pairs_arguments_in_order() {
        assert_eq!(
            parse_channel_modes("+o-v alice bob"),
            vec![change(true, 'o', Some("alice")), change(false, 'v', Some("bob"))]
        );
    }

    #[test]
    fn parse_modes_without_arguments() {
        assert_eq!(
            parse_channel_modes("+nt"),
            vec![change(true, 'n', None), change(true, 't', None)]
        );
        assert!(parse_channel_modes("").is_empty());
    }

    #[test]
    fn parse_modes_missing_argument() {
        assert_eq!(parse_channel_modes("-o"), vec![change(false, 'o', None)]);
    }

    // --- connect ---

    #[test]
    fn connected_joins_valid_channels_only() {
        let mut config = BotConfig::default();
        config.channels.active = vec!["#a".into(), "nochannel".into(), "&b".into()];
        let actions = controller_with(config).handle(Event::Connected);
        assert_eq!(actions, vec![joined("#a"), joined("&b")]);
    }

    // --- messages ---

    #[test]
    fn untriggered_message_is_learned_silently() {
        let mut bot = controller();
        let actions = bot.handle(message("alice", "#skizzo", "the cat sat"));
        assert!(actions.is_empty());
        let store = bot.brain().channel("#skizzo").unwrap();
        assert_eq!(store.key_count(Direction::Forward), 3);
    }

    #[test]
    fn learning_is_per_channel() {
        let mut bot = controller();
        bot.handle(message("alice", "#a", "only in a"));
        assert!(bot.brain().channel("#a").is_some());
        assert!(bot.brain().channel("#b").is_none());
    }

    #[test]
    fn leading_address_is_not_learned() {
        let mut bot = controller();
        bot.handle(message("alice", "#skizzo", "skizzobot: hello"));
        let store = bot.brain().channel("#skizzo").unwrap();
        assert_eq!(store.key_count(Direction::Forward), 1);
    }

    #[test]
    fn bare_nick_on_empty_brain_echoes_line() {
        let mut bot = controller();
        let actions = bot.handle(message("alice", "#skizzo", "skizzobot"));
        assert_eq!(actions, vec![said("#skizzo", "skizzobot")]);
    }

    #[test]
    fn triggered_message_gets_generated_reply() {
        let mut bot = controller();
        let actions = bot.handle(message("alice", "#skizzo", "skizzobot: hello"));
        assert_eq!(actions, vec![said("#skizzo", "hello")]);
    }

    #[test]
    fn custom_triggers_replace_nick() {
        let mut config = BotConfig::default();
        config.channels.triggers = vec!["babble".into()];
        let mut bot = controller_with(config);
        assert!(bot.handle(message("alice", "#skizzo", "skizzobot hi")).is_empty());
        assert_eq!(bot.handle(message("alice", "#skizzo", "babble")).len(), 1);
    }

    #[test]
    fn store_failure_drops_line() {
        let mut bot: Controller<FailingStore, SmallRng> =
            Controller::new(BotConfig::default(), Brain::new(), SmallRng::seed_from_u64(1));
        let actions = bot.handle(message("alice", "#skizzo", "skizzobot: hi there"));
        assert!(actions.is_empty());
    }

    #[test]
    fn read_failure_learns_but_stays_quiet() {
        let mut bot: Controller<WriteOnlyStore, SmallRng> =
            Controller::new(BotConfig::default(), Brain::new(), SmallRng::seed_from_u64(1));
        let actions = bot.handle(message("alice", "#skizzo", "skizzobot: hi there"));
        assert!(actions.is_empty());

        let learned = &bot.brain().channel("#skizzo").unwrap().0;
        assert_eq!(learned.key_count(Direction::Forward), 2);
        assert_eq!(learned.key_count(Direction::Backward), 2);
    }

    #[test]
    fn one_line_strips_line_breaks() {
        assert_eq!(one_line("a\nb\r\nc"), "a b c");
    }

    // --- joins ---

    #[test]
    fn own_join_greets_channel() {
        let mut bot = controller();
        assert_eq!(bot.handle(join("skizzobot")), vec![said("#skizzo", "Hello!")]);
    }

    #[test]
    fn other_join_greets_user() {
        let mut bot = controller();
        assert_eq!(bot.handle(join("alice")), vec![said("#skizzo", "alice: Hi!")]);
    }

    #[test]
    fn join_flood_is_not_greeted() {
        let mut bot = controller();
        let start = Instant::now();
        assert_eq!(bot.handle_at(join("alice"), start).len(), 1);
        assert!(bot.handle_at(join("bob"), start + Duration::from_millis(200)).is_empty());
        // The quiet period restarts with every join.
        assert!(bot.handle_at(join("carol"), start + Duration::from_millis(1100)).is_empty());
        assert_eq!(
            bot.handle_at(join("dave"), start + Duration::from_millis(2500)),
            vec![said("#skizzo", "dave: Hi!")]
        );
    }

    #[test]
    fn empty_templates_suppress_greeting() {
        let mut config = BotConfig::default();
        config.messages.hello_user.clear();
        let mut bot = controller_with(config);
        assert!(bot.handle(join("alice")).is_empty());
    }

    // --- kicks and modes ---

    #[test]
    fn kick_rejoins_and_remembers() {
        let mut bot = controller();
        let actions = bot.handle(kick("mallory", "skizzobot"));
        assert_eq!(
            actions,
            vec![
                joined("#skizzo"),
                said("#skizzo", "mallory: I'll remember that."),
            ]
        );
        assert_eq!(bot.revenge_list().collect::<Vec<_>>(), vec!["mallory"]);
    }

    #[test]
    fn kick_of_someone_else_is_ignored() {
        let mut bot = controller();
        assert!(bot.handle(kick("mallory", "alice")).is_empty());
        assert_eq!(bot.revenge_list().count(), 0);
    }

    #[test]
    fn op_thanks_and_takes_revenge() {
        let mut bot = controller();
        bot.handle(kick("mallory", "skizzobot"));
        bot.handle(kick("eve", "skizzobot"));

        let actions = bot.handle(mode("alice", "+o skizzobot"));
        assert_eq!(
            actions,
            vec![
                said("#skizzo", "alice: Thanks!"),
                kicked("eve"),
                kicked("mallory"),
            ]
        );
        assert_eq!(bot.revenge_list().count(), 0);
    }

    #[test]
    fn deop_is_disappointing() {
        let mut bot = controller();
        assert_eq!(
            bot.handle(mode("alice", "-o skizzobot")),
            vec![said("#skizzo", "alice: Why?")]
        );
    }

    #[test]
    fn last_op_change_wins() {
        let mut bot = controller();
        assert_eq!(
            bot.handle(mode("alice", "+o-o skizzobot skizzobot")),
            vec![said("#skizzo", "alice: Why?")]
        );
        assert_eq!(
            bot.handle(mode("alice", "-o+o skizzobot skizzobot")),
            vec![said("#skizzo", "alice: Thanks!")]
        );
    }

    #[test]
    fn modes_for_others_are_ignored() {
        let mut bot = controller();
        assert!(bot.handle(mode("alice", "+o bob")).is_empty());
        assert!(bot.handle(mode("alice", "+v skizzobot")).is_empty());
    }

    // --- reset ---

    #[test]
    fn reset_forgets_only_that_channel() {
        let mut bot = controller();
        bot.handle(message("alice", "#a", "penguins waddle"));
        bot.handle(message("alice", "#b", "seals bark"));

        assert!(bot.handle(Event::Reset { channel: "#a".into() }).is_empty());
        assert!(bot.brain().channel("#a").unwrap().is_empty());
        assert_eq!(bot.brain().channel("#b").unwrap().key_count(Direction::Forward), 2);

        // Back to echoing on the forgotten channel.
        assert_eq!(
            bot.handle(message("alice", "#a", "skizzobot")),
            vec![said("#a", "skizzobot")]
        );
    }

    #[test]
    fn reset_of_unknown_channel_is_harmless() {
        let mut bot = controller();
        assert!(bot.handle(Event::Reset { channel: "#nowhere".into() }).is_empty());
        assert!(bot.brain().channel("#nowhere").is_none());
    }

    // --- run loop ---

    #[test]
    fn run_sends_actions_in_order() {
        let mut bot = controller();
        let mut transport = ScriptedTransport::new(vec![
            Event::Connected,
            message("alice", "#skizzo", "good morning"),
            message("alice", "#skizzo", "skizzobot"),
            join("bob"),
        ]);
        bot.run(&mut transport).unwrap();

        assert_eq!(
            transport.sent,
            vec![
                joined("#skizzo"),
                said("#skizzo", "good morning"),
                said("#skizzo", "bob: Hi!"),
            ]
        );
    }
}
