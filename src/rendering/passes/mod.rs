pub mod pass;
pub mod scene_pass;
