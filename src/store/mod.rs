pub mod tick_buffer;
