pub mod digital;
