use rules_syntax::ast::{AllowDeclaration, FunctionDeclaration, MatchDeclaration};
use rules_syntax::{parse, walk_match, Result, Spanned, Visitor};

struct Outline {
    depth: usize,
}

impl Outline {
    fn line(&self, text: String) {
        println!("{:indent$}{}", "", text, indent = self.depth * 2);
    }
}

impl Visitor for Outline {
    fn visit_match(&mut self, m: &Spanned<MatchDeclaration>) {
        let path: String = m.path.iter().map(ToString::to_string).collect();
        self.line(format!("match {}", path));
        self.depth += 1;
        walk_match(self, m);
        self.depth -= 1;
    }

    fn visit_function(&mut self, function: &Spanned<FunctionDeclaration>) {
        let params: Vec<_> = function.params.iter().map(|p| p.node.as_str()).collect();
        self.line(format!("function {}({})", function.name, params.join(", ")));
    }

    fn visit_allow(&mut self, allow: &Spanned<AllowDeclaration>) {
        let ops: Vec<_> = allow.operations.iter().map(|o| o.as_str()).collect();
        self.line(format!("allow {} if {}", ops.join(", "), allow.condition));
    }
}

fn main() -> Result<()> {
    let file = parse(
        r#"
        service cloud.firestore {
          match /databases/{database}/documents {
            function isAdmin() {
              return exists(/databases/$(database)/documents/admins/$(request.auth.uid));
            }
            match /posts/{post} {
              allow read;
              allow create, update: if isAdmin() || request.resource.data.author == request.auth.uid;
            }
          }
        }
    "#,
    );

    // `allow read;` has no condition
    if let Err(e) = &file {
        println!("rejected: {}", e);
    }

    let file = parse(
        r#"
        service cloud.firestore {
          match /databases/{database}/documents {
            function isAdmin() {
              return exists(/databases/$(database)/documents/admins/$(request.auth.uid));
            }
            match /posts/{post} {
              allow read: if true;
              allow create, update: if isAdmin() || request.resource.data.author == request.auth.uid;
            }
          }
        }
    "#,
    )?;

    for service in &file.services {
        println!("service {}", service.name);
        let mut outline = Outline { depth: 1 };
        outline.visit_service(service);
    }

    Ok(())
}
