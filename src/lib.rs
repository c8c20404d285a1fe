pub mod column;
pub mod data;
pub mod expression;
pub mod model;
pub mod query;
pub mod sql;
