pub mod dispatcher;
pub mod ledger;
pub mod model;
pub mod rules;
pub mod toast;
