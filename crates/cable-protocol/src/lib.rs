//! # cable-protocol
//!
//! Wire protocol definitions for the Cable channel client.
//!
//! The channel protocol is JSON over a framed text socket. Outbound traffic is
//! an [`Envelope`] whose `identifier` and `data` fields are themselves JSON
//! documents encoded as strings. Inbound traffic is a JSON object classified by
//! its `type` field.
//!
//! ## Envelope Commands
//!
//! - `subscribe` / `unsubscribe` - Channel membership
//! - `message` - Perform an action on a subscribed channel
//!
//! ## Inbound Frame Types
//!
//! - `welcome` - Server accepted the connection
//! - `ping` - Keepalive
//! - `confirm_subscription` / `reject_subscription` - Subscription outcome
//! - anything else - Application message
//!
//! ## Example
//!
//! ```rust
//! use cable_protocol::{codec, Command, Identifier, MessageFactory};
//! use serde_json::json;
//!
//! let factory = MessageFactory::new(Identifier::channel_name("RoomChannel"));
//! let envelope = factory.create(Command::Message, "speak", &json!({"message": "hi"}));
//!
//! let encoded = codec::encode(&envelope).unwrap();
//! let decoded = codec::decode_envelope(std::str::from_utf8(&encoded).unwrap()).unwrap();
//! assert_eq!(envelope, decoded);
//! ```

pub mod codec;
pub mod envelope;
pub mod frames;
pub mod identifier;

pub use codec::{decode, encode, ProtocolError};
pub use envelope::{build_data, is_present, Command, Envelope, MessageFactory};
pub use frames::{FrameType, InboundFrame};
pub use identifier::{Identifier, CHANNEL_KEY};
