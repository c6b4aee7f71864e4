pub mod xml_loader;
