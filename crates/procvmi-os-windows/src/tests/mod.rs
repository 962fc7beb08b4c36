mod facade;
mod process;
mod thread;
