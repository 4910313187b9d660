pub(crate) mod jwt_strategy;
pub(crate) mod single_flight;
