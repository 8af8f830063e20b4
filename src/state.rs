use crate::config::AppConfig;
use crate::db::{DbPool, OrmConn};
use crate::payments::PaymentGateway;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub gateway: PaymentGateway,
    pub config: AppConfig,
}
