// Pipeline-level tests over in-memory backends

mod test_enhance;
mod test_generator;
mod test_image_generator;
