pub mod config;
pub mod job;
pub mod registry;
pub mod reload;
pub mod retry;
pub mod scheduler;
pub mod source;
pub mod value;
pub mod task {
    pub mod context;
    pub mod transformer;
    pub mod alias {
        pub mod config;
        pub mod processor;
    }
    pub mod array {
        pub mod config;
        pub mod processor;
    }
    pub mod field {
        pub mod config;
        pub mod processor;
    }
    pub mod parse {
        pub mod config;
        pub mod processor;
    }
    pub mod print {
        pub mod config;
        pub mod processor;
    }
    pub mod regex {
        pub mod config;
        pub mod processor;
    }
    pub mod script {
        pub mod config;
        pub mod processor;
    }
    pub mod sequence {
        pub mod config;
        pub mod processor;
    }
    pub mod value {
        pub mod config;
        pub mod processor;
    }

    use crate::registry::{Error, Registry};

    /// Registers every step type shipped with the core crate.
    pub fn register_builtins(registry: &Registry) -> Result<(), Error> {
        registry.register(alias::config::TASK_TYPE, alias::processor::build)?;
        registry.register(sequence::config::TASK_TYPE, sequence::processor::build)?;
        registry.register(field::config::TASK_TYPE, field::processor::build)?;
        registry.register(array::config::TASK_TYPE, array::processor::build)?;
        registry.register(value::config::TASK_TYPE, value::processor::build)?;
        registry.register(print::config::TASK_TYPE, print::processor::build)?;
        registry.register(regex::config::TASK_TYPE, regex::processor::build)?;
        registry.register(parse::config::TASK_TYPE, parse::processor::build)?;
        registry.register(script::config::TASK_TYPE, script::processor::build)?;
        Ok(())
    }
}
