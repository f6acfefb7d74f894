#![deny(clippy::all)]
#![warn(clippy::nursery)]
#![warn(clippy::pedantic)]
#![warn(clippy::todo)]
// #![warn(clippy::cargo)]
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]

#[tokio::main]
async fn main() {
    app::run().await;
}


pub mod cfg {
    mod app_settings;
    mod database_settings;
    mod guard_settings;
    mod jwt_settings;
    mod server_settings;

    pub use app_settings::*;
    pub use database_settings::*;
    pub use guard_settings::*;
    pub use jwt_settings::*;
    pub use server_settings::*;
}

pub mod core {
    mod context;

    pub use context::*;
}

pub mod auth {
    mod jwt;
    mod password;

    pub use jwt::*;
    pub use password::*;
}

pub mod db {
    mod database;
    mod invitations;
    mod memberships;
    mod profiles;
    mod refresh_tokens;
    mod signup_requests;
    mod tenants;
    mod users;

    pub use database::*;
    pub use invitations::*;
    pub use memberships::*;
    pub use profiles::*;
    pub use refresh_tokens::*;
    pub use signup_requests::*;
    pub use tenants::*;
    pub use users::*;
}

pub mod session {
    mod events;
    mod guard;
    mod registry;
    mod resolver;
    mod state;

    pub use events::*;
    pub use guard::*;
    pub use registry::*;
    pub use resolver::*;
    pub use state::*;
}

pub mod middleware {
    pub mod rate_limit;
}

pub mod routes {
    pub mod api;
    pub mod assets;
    pub mod auth;
    pub mod health;
    pub mod onboarding;
    pub mod session;
}

pub mod app {
    mod cli;
    mod router;
    mod server;

    pub use cli::*;
    pub use router::*;
    pub use server::*;
}
