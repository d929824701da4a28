//! Scenario-based tests for brewsteps

mod actor_stop_order;
mod boil_alerts;
mod cooldown_estimate;
mod full_recipe;
mod mash_trigger;
mod toggle_actor;
mod wait_countdown;
