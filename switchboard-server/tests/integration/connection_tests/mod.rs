mod test_close_announces_once;
mod test_connect_assigns_id;
