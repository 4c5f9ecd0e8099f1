pub mod plan_request;
pub mod planner;
pub mod reminders;
pub mod schedule_service;
