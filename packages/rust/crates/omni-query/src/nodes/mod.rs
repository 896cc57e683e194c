mod gateway;
mod health;
mod serve;
mod worker;

pub(crate) use gateway::run_gateway_mode;
pub(crate) use health::run_health_mode;
pub(crate) use serve::run_serve_mode;
pub(crate) use worker::run_worker_mode;
