//! Application layer: the services HTTP handlers call into.

pub mod services;

pub use services::{
    Actor, CreateReward, LoginOutcome, Registration, RewardService, ServiceError, ServiceResult,
    UserService,
};
