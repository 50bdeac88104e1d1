pub mod capture;
pub mod encode;
pub mod energy;
pub mod output;
pub mod resample;
