pub mod chrome;
pub mod factory;
pub mod interaction;

pub use chrome::ChromePage;
pub use factory::BrowserFactory;
pub use interaction::InteractionDriver;
