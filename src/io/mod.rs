pub mod bwtfile;
