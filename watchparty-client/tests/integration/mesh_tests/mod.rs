mod test_full_mesh;
mod test_departure;
