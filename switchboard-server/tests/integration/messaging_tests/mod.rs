mod test_lobby_usernames;
