mod ask;
mod distinct;
mod errors;
mod join;
mod minus;
mod modes;
