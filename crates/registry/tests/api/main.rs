mod helpers;
mod history;
mod register;
