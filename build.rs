fn main() -> Result<(), Box<dyn std::error::Error>> {
	vergen_gitcl::Emitter::default()
		.add_instructions(&vergen_gitcl::CargoBuilder::all_cargo()?)?
		.add_instructions(&vergen_gitcl::GitclBuilder::all_git()?)?
		.emit()?;

	Ok(())
}
