pub mod pzem;
