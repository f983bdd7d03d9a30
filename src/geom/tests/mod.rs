mod test_buffers_basic;
mod test_conform_basic;
mod test_select_basic;
mod test_selection_basic;
