mod error;
pub use error::{ConfigError, ConfigResult};

mod value;
pub use value::{ConfigDocument, ConfigValue};

pub mod store;
pub use store::{ConfigStore, Presence};

pub mod resolver;
pub use resolver::ConfigResolver;

pub mod cluster;
pub use cluster::ClusterConfigResolver;

pub mod prelude {
    pub use crate::error::{ConfigError, ConfigResult};
    pub use crate::{
        ClusterConfigResolver, ConfigDocument, ConfigResolver, ConfigStore, ConfigValue, Presence,
    };
}
