// Open-loop drive control for a two-motor robot on a ThunderBorg board

pub mod config;
pub mod motor;
pub mod teleop;
