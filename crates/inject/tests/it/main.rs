mod inject;
