mod common;
mod exports;
mod quote;
mod reservation;
