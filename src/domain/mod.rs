// Domain layer - Battery telemetry models and cycle-set rules
pub mod battery;
pub mod cycles;
pub mod temperature;
