pub mod config;
pub mod error;
pub mod models;

pub use config::MqConfig;
pub use error::MqError;
pub use models::{
    BrokerMessage, BrokerQueue, BroccoliError, ChannelQueue, JudgeQueue, MqQueue, channel, init_mq,
};

pub type Mq = MqQueue;
