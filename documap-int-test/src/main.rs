use documap::doc;
use documap::errors::DocumapResult;
use documap_int_test::test_util::{create_test_context, user_repository, User};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;

fn main() -> DocumapResult<()> {
    println!("Starting stress test...");
    let ctx = create_test_context();
    let repo = user_repository(&ctx)?;

    let count = 100_000;
    let start = std::time::Instant::now();
    for n in 0..count {
        let name: String = Name().fake();
        // SafeEmail alone collides at this volume and trips the unique index
        let email = format!("{}.{}", n, SafeEmail().fake::<String>());
        repo.save(&User::new(&name, &email, (n % 90) as i64))?;
    }
    let elapsed = start.elapsed();
    println!("Saved {} records in {:?}", count, elapsed);

    let start = std::time::Instant::now();
    let mut found = 0;
    for user in repo.find(doc! { "age": 42_i64 })? {
        let _ = user?;
        found += 1;
    }
    let elapsed = start.elapsed();
    println!("Found {} records in {:?}", found, elapsed);

    Ok(())
}
