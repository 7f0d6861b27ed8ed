pub mod autoplay;
pub mod catch_object;
pub mod parsing;
pub mod replay;
pub mod sliding_max;
pub mod step_function;
