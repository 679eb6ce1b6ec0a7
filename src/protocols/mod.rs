pub mod pdi;
