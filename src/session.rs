/// Connection lifecycle of a painting run
///
/// Connecting → Painting → Reconnecting → Painting → ... and GaveUp once
/// the attempts run out. GaveUp is terminal.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// First connection, `attempt` counts from 1
    Connecting { attempt: u32 },
    /// Connected and sampling
    Painting,
    /// Connection was lost while painting
    Reconnecting { attempt: u32 },
    /// No more attempts left
    GaveUp { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    ConnectFailed,
    ConnectionLost,
}

impl LinkState {
    pub fn start() -> Self {
        LinkState::Connecting { attempt: 1 }
    }

    pub fn next(self, event: LinkEvent, max_attempts: u32) -> LinkState {
        match (self, event) {
            (
                LinkState::Connecting { .. } | LinkState::Reconnecting { .. },
                LinkEvent::Connected,
            ) => LinkState::Painting,
            (LinkState::Connecting { attempt }, LinkEvent::ConnectFailed) => {
                if attempt >= max_attempts {
                    LinkState::GaveUp { attempts: attempt }
                } else {
                    LinkState::Connecting {
                        attempt: attempt + 1,
                    }
                }
            }
            (LinkState::Reconnecting { attempt }, LinkEvent::ConnectFailed) => {
                if attempt >= max_attempts {
                    LinkState::GaveUp { attempts: attempt }
                } else {
                    LinkState::Reconnecting {
                        attempt: attempt + 1,
                    }
                }
            }
            (LinkState::Painting, LinkEvent::ConnectionLost) => {
                LinkState::Reconnecting { attempt: 1 }
            }
            // Anything else does not move the link
            (state, _) => state,
        }
    }

    /// Attempt number while a connection is being made
    pub fn attempt(&self) -> Option<u32> {
        match self {
            LinkState::Connecting { attempt } | LinkState::Reconnecting { attempt } => {
                Some(*attempt)
            }
            _ => None,
        }
    }
}
