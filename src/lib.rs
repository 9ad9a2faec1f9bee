pub mod config;
pub mod domain {
    pub mod payment;
    pub mod transitions;
}
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod payments;
    }
    pub mod middleware {
        pub mod admin_auth;
    }
}
pub mod repo {
    pub mod memory;
    pub mod pg;
    mod store;

    pub use store::LedgerStore;
}
pub mod service {
    pub mod ledger_service;
}

use domain::payment::PaymentSettings;
use service::ledger_service::LedgerService;

#[derive(Clone)]
pub struct AppState {
    pub ledger_service: LedgerService,
    pub settings: PaymentSettings,
}
