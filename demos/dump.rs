use rules_syntax::{ParserBuilder, Result};

fn main() -> Result<()> {
    let source = r#"
        rules_version = '2';
        service cloud.firestore {
          match /databases/{database}/documents {
            // only the owner may touch their profile
            match /users/{userId} {
              allow read, write: if request.auth != null && request.auth.uid == userId;
            }
          }
        }
    "#;

    let rules = ParserBuilder::from_source(source)
        .with_comments(true)
        .build()?;

    println!("{}", rules.to_json()?);
    println!("{}", rules.file());

    Ok(())
}
