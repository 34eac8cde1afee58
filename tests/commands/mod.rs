mod test_list;
mod test_upsert;
