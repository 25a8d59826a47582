pub mod firebase;
pub mod google;
pub mod redis;
pub mod sqlx;
