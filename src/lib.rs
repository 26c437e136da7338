pub mod codec;
pub mod config;
pub mod conn;
pub mod device;
pub mod error;
pub mod frame;
pub mod listings;
pub mod method;
pub mod protocol;
pub mod skill;
pub mod state;

pub use config::{Config, ConfigError};
pub use conn::{ConnError, Response, Session, SessionConfig, Transport};
pub use device::{Device, Playback, StopOutcome};
pub use error::{Error, ReplyError};
pub use frame::{CommandLine, ReplyLine};
pub use listings::{ChannelDirectory, DirectoryHandle, ListingsClient, ListingsError};
pub use method::InputMethod;
pub use protocol::{Channel, ChannelStatus, Command, IrCode, Reply, Screen};
pub use skill::{Direction, Intent, Power, Skill, SkillResponse};
pub use state::{DeviceState, Mode};
