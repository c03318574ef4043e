//! Console transport: a one-person chat channel on stdin/stdout.
//!
//! Every input line is a message from `you` on the console channel. Slash
//! commands simulate the rest of a channel's life:
//!
//! | command           | event                                   |
//! |-------------------|-----------------------------------------|
//! | `/join <nick>`    | `<nick>` joins the channel              |
//! | `/kick <kicker>`  | `<kicker>` kicks the bot                |
//! | `/op <setter>`    | `<setter>` gives the bot operator status |
//! | `/deop <setter>`  | `<setter>` takes it away                |
//! | `/reset`          | the bot forgets this channel            |
//! | `/quit`           | end of session                          |

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use skizzobot::{Action, Event, Transport, TransportError, parse_channel_modes};

/// Nick the console user speaks as.
const USER: &str = "you";

pub struct Console<I, O> {
    input: I,
    output: O,
    channel: String,
    nick: String,
    pending: VecDeque<Event>,
}

impl<I: BufRead, O: Write> Console<I, O> {
    /// Start a session on `channel` for a bot called `nick`.
    pub fn new(input: I, output: O, channel: &str, nick: &str) -> Self {
        Console {
            input,
            output,
            channel: channel.to_string(),
            nick: nick.to_string(),
            pending: VecDeque::from([Event::Connected]),
        }
    }

    /// Turn one input line into an event. `Ok(None)` ends the session.
    fn parse_line(&mut self, line: &str) -> Result<Option<Event>, TransportError> {
        let Some(command) = line.strip_prefix('/') else {
            return Ok(Some(Event::Message {
                sender: USER.to_string(),
                channel: self.channel.clone(),
                text: line.to_string(),
            }));
        };

        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let who = parts.next().unwrap_or(USER).to_string();
        let channel = self.channel.clone();

        let event = match name {
            "quit" => return Ok(None),
            "join" => Event::Join { nick: who, channel },
            "reset" => {
                writeln!(self.output, "* resetting {channel}")?;
                self.output.flush()?;
                Event::Reset { channel }
            }
            "kick" => Event::Kick {
                kicker: who,
                kicked: self.nick.clone(),
                channel,
            },
            "op" | "deop" => {
                let sign = if name == "op" { '+' } else { '-' };
                Event::Mode {
                    setter: who,
                    channel,
                    changes: parse_channel_modes(&format!("{sign}o {}", self.nick)),
                }
            }
            _ => {
                writeln!(self.output, "* unknown command: /{name}")?;
                self.output.flush()?;
                return self.receive();
            }
        };
        Ok(Some(event))
    }
}

impl<I: BufRead, O: Write> Transport for Console<I, O> {
    fn receive(&mut self) -> Result<Option<Event>, TransportError> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if self.input.read_until(b'\n', &mut buf)? == 0 {
                return Ok(None);
            }
            // Bytes that are not UTF-8 become U+FFFD instead of ending the session.
            let line = String::from_utf8_lossy(&buf);
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                let trimmed = trimmed.to_string();
                return self.parse_line(&trimmed);
            }
        }
    }

    fn send(&mut self, action: &Action) -> Result<(), TransportError> {
        match action {
            Action::Say { channel, text } => {
                writeln!(self.output, "[{channel}] {}: {text}", self.nick)?;
            }
            Action::Join { channel } => {
                writeln!(self.output, "* {} joins {channel}", self.nick)?;
                // A server echoes our own join back to us.
                self.pending.push_back(Event::Join {
                    nick: self.nick.clone(),
                    channel: channel.clone(),
                });
            }
            Action::Kick {
                channel: _,
                nick,
                reason,
            } => {
                writeln!(self.output, "* {} kicks {nick} ({reason})", self.nick)?;
            }
        }
        self.output.flush()?;
        Ok(())
    }
}
