//! The two built-in tabs of the business loan application.

use crate::schema::{DependencyBuilder, GroupOptions, ObjectBuilder, Predicate, SchemaError, SchemaNode};

/// Goods and Services Tax Identification Number
pub const GSTIN_PATTERN: &str = "^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z]{1}[0-9A-Z]{1}[Z]{1}[0-9A-Z]{1}$";

pub const RELATIONSHIPS: [&str; 6] = ["Father", "Mother", "Brother", "Sister", "Spouse", "Other"];

/// Lowest credit score that needs no guarantors
pub const GOOD_CREDIT: f64 = 700.0;

/// Business Details tab.
///
/// `businessName`, `gstin` and each director's `name` are required here. The
/// form as drawn marks none of them required; the requirements are added on top.
pub fn business_details() -> Result<SchemaNode, SchemaError> {
    let director = ObjectBuilder::new()
        .property("name", SchemaNode::string().title("Director Name"))
        .property("panNumber", SchemaNode::string().title("PAN Number"))
        .property("tags", SchemaNode::array(SchemaNode::string()).title("Roles"))
        .required(["name"]);

    let node = ObjectBuilder::new()
        .title("Business Details")
        .property("businessName", SchemaNode::string().title("Business Name"))
        .property("gstin", SchemaNode::string().title("GSTIN").pattern(GSTIN_PATTERN))
        .property(
            "directors",
            SchemaNode::array(director)
                .title("Directors")
                .options(GroupOptions {
                    addable: true,
                    removable: true,
                    orderable: true,
                }),
        )
        .required(["businessName", "gstin"])
        .build()?;
    Ok(node.into())
}

/// Loan Details tab, branching on `creditScore` at [`GOOD_CREDIT`].
///
/// `creditScore` and `loanAmount` are required, and below [`GOOD_CREDIT`] so are
/// `guarantors` and `bankStatement`. The form as drawn only constrains ranges and
/// item counts; these requirements are added on top.
pub fn loan_details() -> Result<SchemaNode, SchemaError> {
    let guarantor = ObjectBuilder::new()
        .property("name", SchemaNode::string().title("Name"))
        .property("panNumber", SchemaNode::string().title("PAN Number"))
        .property(
            "relationship",
            SchemaNode::string()
                .title("Relationship with Applicant")
                .enum_values(RELATIONSHIPS),
        )
        .property("relation", SchemaNode::string().title("Specify Relation"))
        .dependency(
            DependencyBuilder::on("relationship")
                .branch(Predicate::one_of(["Other"]), ObjectBuilder::new().required(["relation"])),
        );

    let low_credit = ObjectBuilder::new()
        .property(
            "guarantors",
            SchemaNode::array(guarantor).title("Guarantors").min_items(2),
        )
        .property(
            "bankStatement",
            SchemaNode::array(SchemaNode::string().format("data-url")).title("Bank Statements"),
        )
        .required(["guarantors", "bankStatement"]);

    let node = ObjectBuilder::new()
        .title("Loan Details")
        .property("creditScore", SchemaNode::number().title("Credit Score").range(300.0, 900.0))
        .property(
            "loanAmount",
            SchemaNode::number().title("Required Loan Amount").range(50_000.0, 500_000.0),
        )
        .required(["creditScore", "loanAmount"])
        .dependency(
            DependencyBuilder::on("creditScore")
                .branch(Predicate::at_least(GOOD_CREDIT), ObjectBuilder::new())
                .branch(Predicate::at_most(GOOD_CREDIT - 1.0), low_credit),
        )
        .build()?;
    Ok(node.into())
}
